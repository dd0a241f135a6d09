use crate::cli::actions::Action;
use crate::identigo::new;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { port, dsn, seed } => {
            new(port, &dsn, seed).await?;
        }
    }

    Ok(())
}
