use facegate::common::paths::DataLayout;
use facegate::core::enroll::Enroller;
use facegate::core::features::FeatureExtractor;
use facegate::core::recognizer::Recognizer;
use facegate::core::verify::run_verification;
use facegate::core::{Outcome, OrtFaceDetector};
use facegate::model::trainer::Trainer;
use facegate::storage::accounts::{self, AccountStore, FileAccountStore};
use facegate::storage::corpus::CorpusScanner;
use facegate::storage::name_map::NameMap;
use facegate::{camera::Camera, model::artifacts, Config, FacegateError};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "facegate")]
#[command(about = "Face login bound to account credentials")]
struct Cli {
    /// Path to the TOML config file; defaults are used when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data root from the config
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account (password credential + face hash chain)
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Check a password against the stored credential
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Replace the password credential
    ChangePassword {
        #[arg(short, long)]
        username: String,
        #[arg(long)]
        old_password: String,
        #[arg(long)]
        new_password: String,
    },
    /// Capture face samples for an account and retrain the model
    Enroll {
        #[arg(short, long)]
        username: String,
    },
    /// Verify a live face against an account
    Verify {
        #[arg(short, long)]
        username: String,
    },
    /// Rebuild the dataset from the corpus and retrain without enrolling
    Train,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::default(),
    };
    if let Some(root) = cli.data_root {
        config.storage.data_root = root;
    }

    let layout = DataLayout::new(config.storage.data_root.clone())?;
    let store = FileAccountStore::new(layout.accounts_dir())?;

    match cli.command {
        Commands::Register {
            name,
            username,
            password,
        } => {
            let record = accounts::create_account(&store, &name, &username, &password)?;
            println!("Registered '{}' (id {})", record.username, record.id);
        }
        Commands::Login { username, password } => {
            if accounts::login_with_password(&store, &username, &password)? {
                println!("Login OK");
            } else {
                println!("Login failed");
                std::process::exit(1);
            }
        }
        Commands::ChangePassword {
            username,
            old_password,
            new_password,
        } => {
            if accounts::change_password(&store, &username, &old_password, &new_password)? {
                println!("Password updated");
            } else {
                println!("Old password is not valid");
                std::process::exit(1);
            }
        }
        Commands::Enroll { username } => {
            let detector = OrtFaceDetector::new(&config)?;
            let extractor = FeatureExtractor::new(config.features.crop_size);
            let trainer = Trainer::new(config.training.clone());
            let enroller = Enroller::new(
                &detector,
                &extractor,
                &trainer,
                &layout,
                config.training.min_sample,
                config.enrollment.target_captures,
            );

            let mut camera = Camera::new(&config.camera)?;
            println!("Look at the camera...");
            let mut session = camera.start_session()?;
            let key = enroller.enroll(&mut session, &store, &username)?;
            println!("Enrolled '{}' as {}", username, key);
        }
        Commands::Verify { username } => {
            let account = store
                .find_by_username(&username)?
                .ok_or_else(|| FacegateError::AccountNotFound(username.clone()))?;
            if !account.face_added {
                println!("Account '{}' has no enrolled face", username);
                std::process::exit(1);
            }

            let detector = OrtFaceDetector::new(&config)?;
            let extractor = FeatureExtractor::new(config.features.crop_size);
            let recognizer = Recognizer::load(&layout, &config.recognizer)?;
            let names = NameMap::load(&layout.name_map_path())?;
            names.validate_against_corpus(&layout.corpus_dir())?;

            let mut camera = Camera::new(&config.camera)?;
            println!("Look at the camera...");
            let mut session = camera.start_session()?;

            let outcome = run_verification(
                &mut session,
                &detector,
                &extractor,
                &recognizer,
                &names,
                &account,
                config.session.clone(),
            )?;

            match outcome {
                Outcome::Accepted => println!("Verification: ACCEPTED"),
                Outcome::Rejected => {
                    println!("Verification: REJECTED");
                    std::process::exit(1);
                }
                Outcome::Abandoned => {
                    println!("Verification: ABANDONED (no face seen)");
                    std::process::exit(1);
                }
            }
        }
        Commands::Train => {
            let detector = OrtFaceDetector::new(&config)?;
            let extractor = FeatureExtractor::new(config.features.crop_size);
            let scanner = CorpusScanner::new(&detector, &extractor, config.training.min_sample);
            let dataset = scanner.build_dataset(&layout.corpus_dir())?;
            println!(
                "Dataset: {} samples across {} people",
                dataset.len(),
                dataset.distinct_labels().len()
            );

            let trainer = Trainer::new(config.training.clone());
            let model = trainer.train(&dataset)?;
            artifacts::save_pair(&model, &layout)?;
            println!("Model pair retrained and saved");
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}
