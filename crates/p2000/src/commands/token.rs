//! Token command handler.

use secrecy::ExposeSecret;
use serde::Serialize;

use p2000_core::Client;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct TokenOutput {
    token: String,
}

pub async fn handle(client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    let token = client.fetch_token().await?;
    let data = TokenOutput {
        token: token.expose_secret().to_owned(),
    };

    let out = output::render_single(
        &global.output_format(),
        &data,
        |t| t.token.clone(),
        |t| t.token.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
