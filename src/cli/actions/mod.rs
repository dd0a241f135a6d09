pub mod server;

use crate::identigo::seed::SeedConfig;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        seed: SeedConfig,
    },
}
