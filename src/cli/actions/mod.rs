pub mod server;

/// Actions the CLI can dispatch to.
#[derive(Debug)]
pub enum Action {
    Server(server::Args),
}
