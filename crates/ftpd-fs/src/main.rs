mod localfs;

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::Parser;
use ftpd::{CustomCommandTable, Server, ServerContext};
use localfs::LocalFs;

#[derive(Debug, clap::Parser)]
struct Cli {
    /// Address to accept control connections on.
    #[arg(long, default_value = "0.0.0.0:21")]
    bind: String,

    /// IPv4 address advertised in PASV replies. Defaults to the bind
    /// address's host portion; set explicitly when binding behind NAT.
    #[arg(long)]
    advertise: Option<Ipv4Addr>,

    /// Directory served as the FTP root.
    root: PathBuf,

    /// Transfer buffer size in bytes, for both RETR and STOR/APPE.
    #[arg(long)]
    file_buf_size: Option<usize>,
}

async fn run(cli: Cli) -> ftpd::Result<()> {
    if !tokio::fs::try_exists(&cli.root).await? {
        tokio::fs::create_dir_all(&cli.root).await?;
    }

    let advertised = cli.advertise.unwrap_or_else(|| {
        match cli.bind.rsplit_once(':').and_then(|(host, _)| host.parse::<IpAddr>().ok()) {
            Some(IpAddr::V4(addr)) => addr,
            _ => Ipv4Addr::new(127, 0, 0, 1),
        }
    });

    let fs = LocalFs::new(cli.root.clone());
    let mut ctx = ServerContext::new(fs, advertised.octets());
    if let Some(size) = cli.file_buf_size {
        ctx.set_file_buf_size(size);
    }

    let server = Server::new(ctx, CustomCommandTable::new());

    let addr = server.init(&cli.bind).await?;
    log::info!("serving {} on {}", cli.root.display(), addr);

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    server.fini().await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
