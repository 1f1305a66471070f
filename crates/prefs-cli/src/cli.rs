use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use prefs_crypto::Algorithm;

#[derive(Parser)]
#[command(
    name = "prefs",
    about = "Inspect and edit a preference store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store file, overriding the configured path
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Encryption key, overriding the configured key
    #[arg(long, global = true)]
    pub key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum AlgorithmArg {
    Aes,
    Chacha,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Aes => Algorithm::Aes256Gcm,
            AlgorithmArg::Chacha => Algorithm::ChaCha20Poly1305,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a freshly generated encryption key
    Keygen(KeygenArgs),
    /// Print the value at a dotted path (whole document if omitted)
    Get(GetArgs),
    /// Set the value at a dotted path
    Set(SetArgs),
    /// Remove the value at a dotted path
    Reset(ResetArgs),
    /// Export the document as a versioned JSON snapshot
    Export(ExportArgs),
    /// Replace the document with an exported snapshot
    Import(ImportArgs),
}

#[derive(Args)]
pub struct KeygenArgs {
    #[arg(long, value_enum, default_value = "aes")]
    pub algorithm: AlgorithmArg,
}

#[derive(Args)]
pub struct GetArgs {
    pub path: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    pub path: String,
    /// JSON value; anything that does not parse is stored as a string
    pub value: String,
}

#[derive(Args)]
pub struct ResetArgs {
    pub path: String,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keygen_default() {
        let cli = Cli::try_parse_from(["prefs", "keygen"]).unwrap();
        if let Command::Keygen(args) = cli.command {
            assert_eq!(args.algorithm, AlgorithmArg::Aes);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_keygen_chacha() {
        let cli = Cli::try_parse_from(["prefs", "keygen", "--algorithm", "chacha"]).unwrap();
        if let Command::Keygen(args) = cli.command {
            assert_eq!(Algorithm::from(args.algorithm), Algorithm::ChaCha20Poly1305);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_get_without_path() {
        let cli = Cli::try_parse_from(["prefs", "get"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert!(args.path.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set() {
        let cli = Cli::try_parse_from(["prefs", "set", "ui.theme", "\"dark\""]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.path, "ui.theme");
            assert_eq!(args.value, "\"dark\"");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_export_out() {
        let cli = Cli::try_parse_from(["prefs", "export", "-o", "backup.json"]).unwrap();
        if let Command::Export(args) = cli.command {
            assert_eq!(args.out, Some(PathBuf::from("backup.json")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "prefs", "reset", "a.b", "--store", "s.json", "--key", "k", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.store, Some(PathBuf::from("s.json")));
        assert_eq!(cli.key.as_deref(), Some("k"));
        assert!(matches!(cli.command, Command::Reset(_)));
    }

    #[test]
    fn set_requires_value() {
        assert!(Cli::try_parse_from(["prefs", "set", "a"]).is_err());
    }
}
