use clap::{Parser, Subcommand};
use field_visit::{
    default_config_path, stage_from_source, AppConfig, AppError, PhotoOutcome, SubmissionService,
    VisitApiClient, VisitForm,
};
use photo_pipeline::{compress_photo, FsImageSource, PhotoSlot, PickKind};
use sales_auth::{AuthService, Session};
use std::path::{Path, PathBuf};

/// Login flags shared by commands that talk to the API as a user
#[derive(clap::Args, Clone)]
struct LoginArgs {
    #[arg(long, env = "FIELD_VISIT_USER")]
    username: String,

    #[arg(long, env = "FIELD_VISIT_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Parser)]
#[command(name = "field-visit")]
#[command(about = "Record customer visits and upload the visit photo")]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the username registered for this device
    CheckDevice,
    /// Save a visit, then upload its photo
    Submit {
        #[command(flatten)]
        login: LoginArgs,

        #[arg(long)]
        customer_name: String,

        #[arg(long)]
        customer_code: String,

        /// Visit date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long, default_value = "")]
        note: String,

        #[arg(long, default_value = "")]
        remark: String,

        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<String>,

        /// Photo to attach, as if picked from the gallery
        #[arg(long, conflicts_with = "camera")]
        photo: Option<PathBuf>,

        /// Attach the newest capture in the camera directory
        #[arg(long)]
        camera: bool,

        /// Manual retries while the photo upload is pending
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Compress a photo to the upload limit and report the result
    Compress { path: PathBuf },
    /// Search customers by name or code
    SearchCustomer {
        #[command(flatten)]
        login: LoginArgs,

        keyword: String,
    },
    /// Register this device for a new sales user
    Register {
        #[arg(long)]
        name: String,

        #[arg(long, env = "FIELD_VISIT_PASSWORD", hide_env_values = true)]
        password: String,

        /// MANAGER or SALES
        #[arg(long, default_value = "SALES")]
        position: String,

        /// PUSAT, JATIM, JATENG or JAKARTA
        #[arg(long, default_value = "PUSAT")]
        branch: String,
    },
    /// Change the password of the given user
    ChangePassword {
        #[command(flatten)]
        login: LoginArgs,

        #[arg(long)]
        new_password: String,
    },
}

fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default().with_max_level(log::LevelFilter::Info),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = AppConfig::load(&config_path)?;

    match cli.command {
        Command::CheckDevice => {
            let device_id = config.ensure_device_id(&config_path)?;
            let auth = AuthService::new(config.api_base_url.clone(), config.request_timeout())?;
            match auth.check_device(&device_id).await? {
                Some(username) => println!("Device {} belongs to {}", device_id, username),
                None => println!("Device {} is not registered", device_id),
            }
        }
        Command::Submit {
            login,
            customer_name,
            customer_code,
            date,
            note,
            remark,
            latitude,
            longitude,
            photo,
            camera,
            retries,
        } => {
            let date =
                date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
            let mut form = VisitForm::new(&customer_name, &customer_code, &date);
            form.note = note;
            form.remark = remark;
            form.latitude = latitude;
            form.longitude = longitude;
            form.validate()?;

            let session = login_session(&mut config, &config_path, &login).await?;

            let mut slot = PhotoSlot::new();
            let kind = match (&photo, camera) {
                (Some(_), _) => Some(PickKind::Gallery),
                (None, true) => Some(PickKind::Camera),
                (None, false) => None,
            };
            if let Some(kind) = kind {
                let mut source = FsImageSource::new(&config.camera_dir);
                if let Some(path) = &photo {
                    source = source.with_gallery_selection(path);
                }
                match stage_from_source(&source, kind, &config.cache_dir, &mut slot).await? {
                    Some(report) if !report.within_budget => println!(
                        "Warning: {} is {} bytes after compression, over the upload limit",
                        report.file_name, report.size_bytes
                    ),
                    Some(report) => println!(
                        "Photo {} ready ({} bytes, preset {})",
                        report.file_name, report.size_bytes, report.preset_index
                    ),
                    None => println!("No photo picked"),
                }
            }

            let service = SubmissionService::for_session(&session, &config)?;
            form.existing_visit_id = find_existing(service.records(), &session, &form).await;

            let receipt = service.submit(&form, session.user_name(), &mut slot).await?;
            let verb = if receipt.updated { "updated" } else { "saved" };
            match receipt.record_id {
                Some(record_id) => println!("Visit {} {}", record_id, verb),
                None => println!("Visit {}", verb),
            }

            match receipt.photo_outcome {
                PhotoOutcome::Uploaded => println!("Photo uploaded"),
                PhotoOutcome::None => {}
                PhotoOutcome::NotAttempted => {
                    println!("Server returned no visit id, photo was not uploaded")
                }
                PhotoOutcome::Pending { message } => {
                    println!("Photo upload pending: {}", message);
                    retry_pending(&service, &mut slot, retries).await;
                }
            }

            session.logout();
        }
        Command::Compress { path } => {
            let result = compress_photo(&path, &config.cache_dir).await?;
            println!(
                "{:?}: preset {}, {} bytes{}",
                result.output_path,
                result.preset_index,
                result.size_bytes,
                if result.is_within_budget() {
                    ""
                } else {
                    " (over the upload limit)"
                }
            );
        }
        Command::SearchCustomer { login, keyword } => {
            let session = login_session(&mut config, &config_path, &login).await?;
            let client = VisitApiClient::new(&session, config.request_timeout())?;
            let customers = client.search_customers(&keyword).await?;
            if customers.is_empty() {
                println!("No customers match {:?}", keyword.trim());
            }
            for customer in customers {
                println!(
                    "{}\t{}\t{}",
                    customer.code,
                    customer.name,
                    customer.address.unwrap_or_default()
                );
            }
            session.logout();
        }
        Command::Register {
            name,
            password,
            position,
            branch,
        } => {
            let device_id = config.ensure_device_id(&config_path)?;
            let auth = AuthService::new(config.api_base_url.clone(), config.request_timeout())?;
            let message = auth
                .register(&name, &password, &position, &branch, &device_id)
                .await?;
            println!("{}", message);
        }
        Command::ChangePassword {
            login,
            new_password,
        } => {
            let session = login_session(&mut config, &config_path, &login).await?;
            let auth = AuthService::new(session.base_url.clone(), config.request_timeout())?;
            let message = auth
                .change_password(&session, &login.password, &new_password)
                .await?;
            println!("{}", message);
            session.logout();
        }
    }

    Ok(())
}

async fn login_session(
    config: &mut AppConfig,
    config_path: &Path,
    login: &LoginArgs,
) -> Result<Session, AppError> {
    let device_id = config.ensure_device_id(config_path)?;
    let auth = AuthService::new(config.api_base_url.clone(), config.request_timeout())?;
    Ok(auth.login(&login.username, &login.password, &device_id).await?)
}

async fn find_existing(
    client: &VisitApiClient,
    session: &Session,
    form: &VisitForm,
) -> Option<photo_pipeline::RecordId> {
    let date = field_visit::models::normalize_ymd(&form.date);
    let existing = client
        .find_existing_visit(session.user_name(), &form.customer_code, &date)
        .await?;
    let kind = if existing.done { "completed" } else { "draft" };
    println!("Updating {} visit {}", kind, existing.id);
    Some(existing.id)
}

async fn retry_pending(
    service: &SubmissionService<VisitApiClient, photo_pipeline::PhotoUploadService>,
    slot: &mut PhotoSlot,
    retries: u32,
) {
    for attempt in 1..=retries {
        match service.retry_photo(slot).await {
            Ok(()) => {
                println!("Photo uploaded on retry {}", attempt);
                return;
            }
            Err(e) => println!("Retry {} failed: {}", attempt, e.user_message()),
        }
    }
    if let Some(record_id) = slot.pending_record() {
        println!("Photo for visit {} is still pending", record_id);
    }
}
