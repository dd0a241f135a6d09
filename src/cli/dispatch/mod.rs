use crate::cli::actions::Action;
use crate::identigo::seed::{AdminConfig, SeedConfig};
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let roles: Vec<String> = matches
        .get_many::<String>("seed-role")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    // clap enforces email/password pairing via `requires`
    let admin = match (
        matches.get_one::<String>("admin-email"),
        matches.get_one::<String>("admin-password"),
    ) {
        (Some(email), Some(password)) => Some(AdminConfig {
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
            roles: matches
                .get_many::<String>("admin-role")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }),
        _ => None,
    };

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?,
        seed: SeedConfig { roles, admin },
    })
}
