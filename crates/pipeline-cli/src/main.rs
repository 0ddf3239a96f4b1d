use pipeline_cli::{cli, commands, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    let mut stdout = std::io::stdout().lock();
    commands::run(&matches, &mut stdout).await
}
