use std::path::PathBuf;

use clap::Parser;

use psplash_hook::rc::SystemContext;
use psplash_hook::{run_hook, HookEvent, HookKind, SplashControl};

#[derive(Parser)]
#[command(name = "psplash-hook")]
#[command(about = "psplash splash-screen hook for OpenRC-style init systems")]
struct Args {
    /// Hook name as fired by the init system (e.g. "runlevel_start_in");
    /// unrecognized hooks are ignored
    hook: String,

    /// Runlevel or service name the hook refers to
    name: String,

    /// Runtime directory psplash keeps its fifo in
    #[arg(long, default_value = "/run")]
    runtime_dir: PathBuf,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let event = HookEvent::new(HookKind::from_name(&args.hook), args.name);
    let ctx = SystemContext::new();
    let splash = SplashControl::new(args.runtime_dir);

    std::process::exit(run_hook(&event, &ctx, &splash));
}
