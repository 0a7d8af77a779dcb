use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use clipset_media::{
    check_ffmpeg, check_ytdlp, ProcessRunner, ToolCommand, ToolRunner, ERROR_EXCERPT_CHARS,
    FFMPEG_PROGRAM, YTDLP_PROGRAM,
};

const VERSION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "clipset-selfcheck", about = "Check that the pipeline can run on this host")]
struct Args {
    /// Working root that must be creatable
    #[arg(long, env = "CLIPSET_WORKDIR", default_value = "./hdvila_100m")]
    workdir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    println!(
        "clipset-selfcheck: starting with workdir={}",
        args.workdir.display()
    );
    ensure_workdir(&args.workdir).await?;

    check_ytdlp()?;
    check_ffmpeg()?;
    ensure_tool_responds(ToolCommand::new(YTDLP_PROGRAM).arg("--version")).await?;
    ensure_tool_responds(ToolCommand::new(FFMPEG_PROGRAM).arg("-version")).await?;

    println!("clipset-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {}", path.display(), e))
}

async fn ensure_tool_responds(command: ToolCommand) -> anyhow::Result<()> {
    let result = ProcessRunner::new().invoke(&command, VERSION_TIMEOUT).await?;

    if !result.success() {
        return Err(anyhow::anyhow!(
            "{} failed with {:?}: {}",
            command,
            result.exit_code,
            result.error_excerpt(ERROR_EXCERPT_CHARS)
        ));
    }

    let version = result.stdout.lines().next().unwrap_or("").trim();
    println!("clipset-selfcheck: {} -> {}", command.program(), version);
    Ok(())
}
