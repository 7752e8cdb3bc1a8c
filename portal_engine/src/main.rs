use anyhow::Result;

mod cli;
mod runtime;
mod script;

fn main() -> Result<()> {
    let session = cli::parse()?;
    runtime::execute(session)
}
