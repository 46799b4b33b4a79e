use crate::server::Server;
use crate::tools::Dispatcher;
use anyhow::Result;
use std::io;

pub fn execute(dispatcher: Dispatcher) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Server::new(dispatcher).serve(stdin.lock(), stdout.lock())
}
