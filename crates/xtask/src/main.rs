mod arch_check;
mod soak;

const USAGE: &str = "Usage: cargo xtask <command>

Commands:
  arch-check                              Check crate layering and library source rules
  soak [--threads N] [--iterations N]     Stress the backbone from many threads";

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("arch-check") => arch_check::run(),
        Some("soak") => soak::run(soak::SoakOptions::parse(args)?),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}\n\n{USAGE}"),
        None => anyhow::bail!("{USAGE}"),
    }
}
