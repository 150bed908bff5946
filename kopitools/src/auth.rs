use anyhow::Result;
use pasarkopi_engine::AuthProvider;

use crate::app::App;

pub fn login(app: &App, token: &str) -> Result<()> {
    app.creds().store_token(token)?;
    println!("Signed in. The credential is stored in {}", app.storage_path().display());
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    app.creds().clear_token()?;
    println!("Signed out.");
    Ok(())
}

pub fn whoami(app: &App) -> Result<()> {
    if app.creds().is_signed_in() {
        println!("Signed in (credential stored in {}).", app.storage_path().display());
    } else {
        println!("Not signed in. Store a credential with: kopitools login <token>");
    }
    Ok(())
}
