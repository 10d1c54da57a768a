use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "depexec", author, version, about = "Run and report cron dependency tasks")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single dependency task and report it
    Exec(ExecArgs),
    /// Read newline-delimited JSON task descriptors and run them
    Serve(ServeArgs),
    /// Print the effective configuration
    Config,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExecArgs {
    #[arg(long)]
    pub job_id: i64,

    #[arg(long, default_value_t = 0)]
    pub process_id: i64,

    /// Dependency id. A random one is generated when omitted.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub from: String,

    #[arg(long, default_value = "")]
    pub dest: String,

    /// Seconds; 0 uses the configured default.
    #[arg(long, default_value_t = 0)]
    pub timeout: i64,

    /// The command. One argument runs through the shell.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Input file, or `-` for stdin.
    #[arg(long, default_value = "-")]
    pub input: String,
}
