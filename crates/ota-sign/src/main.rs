//! `ota-sign`: signing and verification tooling for OTA firmware images.

mod digest;
mod keygen;
mod pubkey;
mod sign;
mod verify;

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use ota_signing::Algorithm;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Sign firmware images and produce the manifest consumed by the device updater.
#[derive(Parser)]
#[command(name = "ota-sign", version, about)]
struct Args {
    /// Log filter (`RUST_LOG` syntax).
    #[arg(long, global = true, default_value = "info", env = "OTA_SIGN_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new signing keypair.
    Keygen {
        /// Signature algorithm.
        #[arg(long, default_value = "ed25519", value_parser = parse_algorithm)]
        algorithm: Algorithm,
        /// Output path for the private key (hex).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also print both keys in PEM form.
        #[arg(long)]
        pem: bool,
    },

    /// Derive the public key from a private key and optionally compare it with
    /// the key compiled into the device.
    Pubkey {
        /// Signature algorithm.
        #[arg(long, default_value = "ed25519", value_parser = parse_algorithm)]
        algorithm: Algorithm,
        /// Private key file (hex or PKCS#8 PEM). Defaults to the algorithm's secret variable.
        #[arg(long)]
        key: Option<PathBuf>,
        /// Expected public key (hex).
        #[arg(long)]
        expect: Option<String>,
    },

    /// Print the SHA-256 digest of a firmware image.
    Digest {
        /// Firmware image.
        firmware: PathBuf,
    },

    /// Sign a firmware image and write its manifest.
    Sign {
        /// Firmware image.
        firmware: PathBuf,
        /// Manifest output path.
        #[arg(long, default_value = "manifest.json")]
        output: PathBuf,
        /// Firmware version (overrides FIRMWARE_VERSION).
        #[arg(long = "firmware-version")]
        firmware_version: Option<String>,
        /// Signature algorithm (overrides FIRMWARE_ALGORITHM).
        #[arg(long)]
        algorithm: Option<String>,
        /// Private key file (overrides FIRMWARE_SIGNING_KEY_FILE).
        #[arg(long)]
        key: Option<PathBuf>,
        /// Public key the device expects (overrides FIRMWARE_PUBLIC_KEY_HEX).
        #[arg(long)]
        expect_public: Option<String>,
    },

    /// Verify a firmware image against its manifest.
    Verify {
        /// Firmware image.
        firmware: PathBuf,
        /// Manifest path.
        #[arg(long, default_value = "manifest.json")]
        manifest: PathBuf,
        /// Trusted public key (hex), as embedded in the device.
        #[arg(long)]
        public_key: String,
    },
}

fn parse_algorithm(s: &str) -> Result<Algorithm, String> {
    s.parse().map_err(|e: ota_signing::SigningError| e.to_string())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    match args.command {
        Command::Keygen { algorithm, output, pem } => keygen::run(algorithm, output.as_deref(), pem),
        Command::Pubkey { algorithm, key, expect } => pubkey::run(algorithm, key.as_deref(), expect.as_deref()),
        Command::Digest { firmware } => digest::run(&firmware),
        Command::Sign {
            firmware,
            output,
            firmware_version,
            algorithm,
            key,
            expect_public,
        } => sign::run(
            &firmware,
            &output,
            sign::Overrides {
                version: firmware_version,
                algorithm,
                key,
                expect_public,
            },
        ),
        Command::Verify {
            firmware,
            manifest,
            public_key,
        } => verify::run(&firmware, &manifest, &public_key),
    }
}
