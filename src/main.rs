mod utils;

use anyhow::{anyhow, Context, Result};
use binnacle::config::Config;
use binnacle::domain::calendar::calculate_working_dates;
use binnacle::domain::{ActivityFilter, ApprovalState, Evidence, Principal, RequestVacation};
use binnacle::repository::HolidayRepository;
use binnacle::services::{MailService, TracingMailService};
use binnacle::store::{JsonStore, StoreData};
use binnacle::usecases::{ActivityRequest, ActivityResponse};
use binnacle::{logging, App};
use chrono::{Datelike, Duration, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use uuid::Uuid;

use utils::{date_or_today, format_minutes, get_weekday_name, parse_date, parse_datetime, truncate_string};

#[derive(Parser)]
#[command(name = "binnacle")]
#[command(about = "Time tracking of activities, vacations and evidences", long_about = None)]
#[command(version, long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")"))]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user id instead of the configured one
    #[arg(long, global = true)]
    user: Option<i64>,

    /// Also write logs to a daily rotated file
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register and review activities
    #[command(subcommand)]
    Activity(ActivityCommands),
    /// Request and review vacations
    #[command(subcommand)]
    Vacation(VacationCommands),
    /// Project roles and their remaining allowance
    #[command(subcommand)]
    Roles(RoleCommands),
    /// Working calendar queries
    #[command(subcommand)]
    Calendar(CalendarCommands),
    /// Upload and download attachments
    #[command(subcommand)]
    Attachment(AttachmentCommands),
    /// Maintenance jobs
    #[command(subcommand)]
    Jobs(JobCommands),
    /// Organizations activities can be registered against
    #[command(subcommand)]
    Organizations(OrganizationCommands),
    /// Known users
    #[command(subcommand)]
    Users(UserCommands),
    /// Import organizations, projects, roles, users and holidays from a JSON file
    Import {
        /// File with the same layout as the data file
        file: PathBuf,
    },
    /// Configure the acting user
    Config {
        /// User id binnacle acts as
        #[arg(short, long)]
        user: Option<i64>,

        /// Roles of the acting user (admin, activity-approval)
        #[arg(short, long)]
        role: Vec<String>,

        /// Data file location
        #[arg(short, long)]
        data_file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ActivityCommands {
    /// List activities
    List {
        /// First date (YYYY-MM-DD)
        #[arg(short, long)]
        from: Option<String>,

        /// Last date (YYYY-MM-DD)
        #[arg(short, long)]
        to: Option<String>,

        /// Approval state (NA, PENDING, ACCEPTED)
        #[arg(short, long)]
        state: Option<ApprovalState>,

        #[arg(long)]
        organization: Option<i64>,

        #[arg(long)]
        project: Option<i64>,

        #[arg(long)]
        role: Option<i64>,

        /// Owner of the activities (admins only)
        #[arg(long)]
        owner: Option<i64>,
    },
    /// Register a new activity
    Add {
        #[command(flatten)]
        activity: ActivityArgs,

        /// Register on behalf of this username (admins only)
        #[arg(long)]
        for_user: Option<String>,
    },
    /// Replace an existing activity
    Update {
        #[arg(long)]
        id: i64,

        #[command(flatten)]
        activity: ActivityArgs,
    },
    /// Delete an activity
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Approve a pending activity
    Approve {
        #[arg(long)]
        id: i64,
    },
    /// Hours worked per day
    Summary {
        #[arg(short, long)]
        from: Option<String>,

        #[arg(short, long)]
        to: Option<String>,
    },
    /// Hours worked per month of a year, split by role
    Yearly {
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Download the evidence of an activity
    Evidence {
        #[arg(long)]
        id: i64,

        /// Write the file here instead of printing its data URL
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ActivityArgs {
    /// Project role id
    #[arg(short, long)]
    role: i64,

    /// Start (YYYY-MM-DD HH:MM)
    #[arg(short, long)]
    start: String,

    /// End (YYYY-MM-DD HH:MM)
    #[arg(short, long)]
    end: String,

    #[arg(short, long, default_value = "")]
    description: String,

    #[arg(short, long)]
    billable: bool,

    /// Evidence file (pdf, png, jpg, jpeg or gif)
    #[arg(long)]
    evidence: Option<PathBuf>,
}

#[derive(Subcommand)]
enum VacationCommands {
    /// Request a vacation period
    Request {
        /// First day (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,

        /// Last day (YYYY-MM-DD)
        #[arg(short, long, conflicts_with = "days")]
        end: Option<String>,

        /// Number of working days instead of a last day
        #[arg(short = 'd', long)]
        days: Option<usize>,

        /// Year the days are charged to (default: year of the first day)
        #[arg(short, long)]
        charge_year: Option<i32>,

        #[arg(long)]
        description: Option<String>,
    },
    /// Change a pending vacation period
    Update {
        #[arg(long)]
        id: i64,

        #[arg(short, long)]
        start: String,

        #[arg(short, long)]
        end: String,

        #[arg(short, long)]
        charge_year: Option<i32>,

        #[arg(long)]
        description: Option<String>,
    },
    /// Holidays, vacations and remaining days of a year
    List {
        #[arg(short, long)]
        year: Option<i32>,
    },
}

#[derive(Subcommand)]
enum RoleCommands {
    /// Roles used during the last month
    Latest {
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Show a project role
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Roles of a project
    Project {
        #[arg(long)]
        id: i64,

        #[arg(short, long)]
        year: Option<i32>,
    },
}

#[derive(Subcommand)]
enum CalendarCommands {
    /// Count the workable days between two dates
    WorkableDays {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum AttachmentCommands {
    /// Upload a file as a temporary attachment
    Upload {
        file: PathBuf,

        /// Mime type (default: guessed from the extension)
        #[arg(short, long)]
        mime_type: Option<String>,
    },
    /// Download an attachment
    Get {
        id: Uuid,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// Mail users about roles still missing their one-time evidence
    EvidenceReminder,
    /// Delete temporary attachments older than the configured TTL
    PurgeAttachments,
}

#[derive(Subcommand)]
enum OrganizationCommands {
    /// Organizations with an open project that has roles
    Imputable,
}

#[derive(Subcommand)]
enum UserCommands {
    /// List every user
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_file {
        if let Err(e) = logging::init_with_file("binnacle.log") {
            eprintln!("Warning: could not set up file logging: {}", e);
            logging::init();
        }
    } else {
        logging::init();
    }

    match run(cli).await {
        Ok(_) => (),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;

    if let Commands::Config { user, role, data_file } = cli.command {
        return configure(config, user, role, data_file);
    }
    if let Some(user) = cli.user {
        config.user_id = Some(user);
    }

    let store = Arc::new(JsonStore::open(config.data_file_path()?)?);
    let mail_service: Arc<dyn MailService> = Arc::new(TracingMailService::new(config.mail.clone()));
    let app = App::new(store, &config, mail_service);
    let json = cli.json;

    match cli.command {
        Commands::Activity(command) => {
            let principal = resolve_principal(&mut config)?;
            handle_activity_command(&app, &config, &principal, command, json).await
        }
        Commands::Vacation(command) => {
            let principal = resolve_principal(&mut config)?;
            handle_vacation_command(&app, &principal, command, json).await
        }
        Commands::Roles(command) => {
            let principal = resolve_principal(&mut config)?;
            handle_role_command(&app, &principal, command, json).await
        }
        Commands::Calendar(CalendarCommands::WorkableDays { from, to }) => {
            let days = app
                .calendar
                .workable_days(parse_date(&from)?, parse_date(&to)?)
                .await?;
            print_output(json, &days, || {
                println!("{} workable days between {} and {}", days.len(), from, to);
                for day in &days {
                    println!("  {} ({})", day, get_weekday_name(day));
                }
            })
        }
        Commands::Attachment(command) => {
            let principal = resolve_principal(&mut config)?;
            handle_attachment_command(&app, &config, &principal, command, json).await
        }
        Commands::Jobs(JobCommands::EvidenceReminder) => {
            let sent = app.reminders.send_reminders().await?;
            print_output(json, &sent, || println!("📧 Sent {} evidence reminder(s)", sent))
        }
        Commands::Jobs(JobCommands::PurgeAttachments) => {
            let deleted = app.attachments.delete_temporary_attachments().await?;
            print_output(json, &deleted, || {
                println!("🗑️  Deleted {} temporary attachment(s)", deleted)
            })
        }
        Commands::Organizations(OrganizationCommands::Imputable) => {
            let organizations = app.organizations.get().await?;
            print_output(json, &organizations, || {
                if organizations.is_empty() {
                    println!("No imputable organizations.");
                }
                for organization in &organizations {
                    println!("{:>5}  {}", organization.id, organization.name);
                }
            })
        }
        Commands::Users(UserCommands::List) => {
            let users = app.users.get_all_users().await?;
            print_output(json, &users, || {
                for user in &users {
                    println!(
                        "{:>5}  {:<16}  {:<24}  {}{}",
                        user.id,
                        truncate_string(&user.username, 16),
                        truncate_string(&user.name, 24),
                        user.email,
                        if user.active { "" } else { "  (inactive)" }
                    );
                }
            })
        }
        Commands::Import { file } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("Could not read {}", file.display()))?;
            let data: StoreData = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid import file {}", file.display()))?;
            app.store().import(data).await?;
            println!("✅ Imported {}", file.display());
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn configure(
    mut config: Config,
    user: Option<i64>,
    roles: Vec<String>,
    data_file: Option<PathBuf>,
) -> Result<()> {
    config.user_id = match user {
        Some(user) => Some(user),
        None => Some(Config::prompt_for_user_id()?),
    };
    if !roles.is_empty() {
        config.roles = roles;
    }
    if data_file.is_some() {
        config.data_file = data_file;
    }
    config.save()?;

    println!("✅ Configuration saved");
    if let Some(path) = Config::get_config_path() {
        println!("Config file: {}", path.display());
    }
    println!("Data file: {}", config.data_file_path()?.display());
    Ok(())
}

/// Principal from the configuration, asking for the user id the first time
fn resolve_principal(config: &mut Config) -> Result<Principal> {
    if config.user_id.is_none() {
        println!("No user configured yet. Let's set one up!");
        config.user_id = Some(Config::prompt_for_user_id()?);
        config.save()?;
    }
    Ok(config.principal()?)
}

async fn handle_activity_command(
    app: &App,
    config: &Config,
    principal: &Principal,
    command: ActivityCommands,
    json: bool,
) -> Result<()> {
    match command {
        ActivityCommands::List {
            from,
            to,
            state,
            organization,
            project,
            role,
            owner,
        } => {
            let filter = ActivityFilter {
                start_date: from.as_deref().map(parse_date).transpose()?,
                end_date: to.as_deref().map(parse_date).transpose()?,
                approval_state: state,
                organization_id: organization,
                project_id: project,
                role_id: role,
                user_id: owner,
            };
            let activities = app.activities.get_activities(&filter, principal).await?;
            print_output(json, &activities, || print_activities(&activities))
        }
        ActivityCommands::Add { activity, for_user } => {
            let request = activity_request(config, None, &activity)?;
            let created = match for_user {
                Some(username) => {
                    app.activities
                        .create_activity_for_username(&request, &username, principal)
                        .await?
                }
                None => app.activities.create_activity(&request, principal).await?,
            };
            print_output(json, &created, || {
                println!("✅ Activity created");
                print_activities(std::slice::from_ref(&created));
            })
        }
        ActivityCommands::Update { id, activity } => {
            let request = activity_request(config, Some(id), &activity)?;
            let updated = app.activities.update_activity(&request, principal).await?;
            print_output(json, &updated, || {
                println!("✅ Activity updated");
                print_activities(std::slice::from_ref(&updated));
            })
        }
        ActivityCommands::Delete { id } => {
            app.activities.delete_activity(id, principal).await?;
            println!("✅ Activity {} deleted", id);
            Ok(())
        }
        ActivityCommands::Approve { id } => {
            let approved = app.activities.approve_activity(id, principal).await?;
            print_output(json, &approved, || println!("✅ Activity {} approved", id))
        }
        ActivityCommands::Summary { from, to } => {
            let end = date_or_today(to.as_deref())?;
            let start = match from {
                Some(from) => parse_date(&from)?,
                None => end - Duration::days(6),
            };
            let summary = app
                .activities
                .get_activities_summary(start, end, principal)
                .await?;
            print_output(json, &summary, || {
                for day in &summary {
                    println!("{} {:<9} {:>6} h", day.date, get_weekday_name(&day.date), day.worked_hours);
                }
            })
        }
        ActivityCommands::Yearly { year } => {
            let year = year.unwrap_or_else(|| Local::now().year());
            let summary = app.activities.get_yearly_summary(year, principal).await?;
            print_output(json, &summary, || {
                if summary.is_empty() {
                    println!("No activities in {}.", year);
                }
                for month in &summary {
                    println!("{}-{:02} {:>8} h", year, month.month, month.worked_hours);
                    for role in &month.roles {
                        println!("    role {:>5} {:>10}", role.project_role_id, format_minutes(role.worked_minutes));
                    }
                }
            })
        }
        ActivityCommands::Evidence { id, output } => {
            let evidence = app.activities.get_activity_evidence(id, principal).await?;
            match output {
                Some(path) => {
                    fs::write(&path, evidence.decode()?)
                        .with_context(|| format!("Could not write {}", path.display()))?;
                    println!("✅ Evidence ({}) written to {}", evidence.mime_type, path.display());
                }
                None => println!("{}", evidence.to_data_url()),
            }
            Ok(())
        }
    }
}

fn activity_request(config: &Config, id: Option<i64>, args: &ActivityArgs) -> Result<ActivityRequest> {
    let evidence = args
        .evidence
        .as_deref()
        .map(|path| evidence_from_file(config, path))
        .transpose()?;

    Ok(ActivityRequest {
        id,
        start: parse_datetime(&args.start)?,
        end: parse_datetime(&args.end)?,
        description: args.description.clone(),
        billable: args.billable,
        project_role_id: args.role,
        has_evidences: evidence.is_some(),
        evidence: evidence.map(|evidence| evidence.to_data_url()),
    })
}

fn evidence_from_file(config: &Config, path: &Path) -> Result<Evidence> {
    let mime_type = guess_mime_type(config, path)?;
    let bytes = fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    Ok(Evidence::from_bytes(&mime_type, &bytes))
}

fn guess_mime_type(config: &Config, path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .ok_or_else(|| anyhow!("{} has no file extension", path.display()))?;
    config
        .mime_type_for_extension(extension)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Unsupported file type: .{}", extension))
}

fn print_activities(activities: &[ActivityResponse]) {
    if activities.is_empty() {
        println!("No activities found.");
        return;
    }
    println!(
        "{:>5}  {:<16}  {:<16}  {:<20}  {:>8}  {:<8}  {}",
        "ID", "Start", "End", "Role", "Duration", "State", "Description"
    );
    for activity in activities {
        println!(
            "{:>5}  {:<16}  {:<16}  {:<20}  {:>8}  {:<8}  {}",
            activity.id.map(|id| id.to_string()).unwrap_or_default(),
            activity.start.format("%Y-%m-%d %H:%M"),
            activity.end.format("%Y-%m-%d %H:%M"),
            truncate_string(&activity.project_role_name, 20),
            format_minutes(activity.duration),
            activity.approval_state,
            truncate_string(&activity.description, 40),
        );
    }
}

async fn handle_vacation_command(
    app: &App,
    principal: &Principal,
    command: VacationCommands,
    json: bool,
) -> Result<()> {
    match command {
        VacationCommands::Request {
            start,
            end,
            days,
            charge_year,
            description,
        } => {
            let start_date = parse_date(&start)?;
            let end_date = match (end, days) {
                (Some(end), _) => parse_date(&end)?,
                (None, Some(days)) => last_working_day(app, start_date, days).await?,
                (None, None) => start_date,
            };
            let request = RequestVacation {
                id: None,
                start_date,
                end_date,
                charge_year: charge_year.unwrap_or_else(|| start_date.year()),
                description,
            };
            let response = app
                .vacations
                .create_private_holiday_period(&request, principal)
                .await?;
            print_output(json, &response, || {
                println!(
                    "✅ Vacation requested from {} to {} ({} working days charged to {})",
                    response.start_date, response.end_date, response.days, response.charge_year
                )
            })
        }
        VacationCommands::Update {
            id,
            start,
            end,
            charge_year,
            description,
        } => {
            let start_date = parse_date(&start)?;
            let request = RequestVacation {
                id: Some(id),
                start_date,
                end_date: parse_date(&end)?,
                charge_year: charge_year.unwrap_or_else(|| start_date.year()),
                description,
            };
            let response = app
                .vacations
                .update_private_holiday_period(&request, principal)
                .await?;
            print_output(json, &response, || {
                println!(
                    "✅ Vacation {} now runs from {} to {} ({} working days)",
                    id, response.start_date, response.end_date, response.days
                )
            })
        }
        VacationCommands::List { year } => {
            let year = year.unwrap_or_else(|| Local::now().year());
            let holidays = app.vacations.get_holidays_by_year(year, principal).await?;
            let charged = app
                .vacations
                .get_vacations_by_charge_year(year, principal)
                .await?;
            let summary = app.vacations.get_vacation_summary(year, principal).await?;

            #[derive(Serialize)]
            struct VacationOverview<'a> {
                holidays: &'a binnacle::usecases::HolidaysResponse,
                charged: &'a [binnacle::domain::VacationDetails],
                summary: &'a binnacle::usecases::VacationSummary,
            }

            let overview = VacationOverview {
                holidays: &holidays,
                charged: &charged,
                summary: &summary,
            };
            print_output(json, &overview, || {
                println!("=== Holidays {} ===", year);
                for holiday in &holidays.holidays {
                    println!("  {} {}", holiday.date, holiday.description);
                }
                println!("\n=== Vacations charged to {} ===", year);
                for vacation in &charged {
                    println!(
                        "  {:>4}  {} .. {}  {:>2} days  {}",
                        vacation.id.map(|id| id.to_string()).unwrap_or_default(),
                        vacation.start_date,
                        vacation.end_date,
                        vacation.days.len(),
                        vacation.state
                    );
                }
                println!(
                    "\n{} of {} days left",
                    summary.remaining_days, summary.corresponding_days
                );
            })
        }
    }
}

/// Last day of a period of `days` working days starting at `start`
async fn last_working_day(app: &App, start: NaiveDate, days: usize) -> Result<NaiveDate> {
    let horizon = start + Duration::days(days as i64 * 2 + 31);
    let holidays: Vec<NaiveDate> = HolidayRepository::find_between(app.store().as_ref(), start, horizon)
        .await?
        .into_iter()
        .map(|holiday| holiday.date)
        .collect();
    calculate_working_dates(start, days, &holidays)
        .last()
        .copied()
        .ok_or_else(|| anyhow!("At least one working day is required"))
}

async fn handle_role_command(
    app: &App,
    principal: &Principal,
    command: RoleCommands,
    json: bool,
) -> Result<()> {
    let roles = match command {
        RoleCommands::Latest { year } => {
            app.project_roles.latest_project_roles(year, principal).await?
        }
        RoleCommands::Project { id, year } => {
            app.project_roles
                .get_project_roles_by_project_id(id, year, principal)
                .await?
        }
        RoleCommands::Show { id } => {
            let role = app.project_roles.get_project_role_by_id(id).await?;
            return print_output(json, &role, || {
                println!("{} (id {})", role.name, role.id);
                println!("Project: {} / {}", role.project.organization.name, role.project.name);
                println!("Unit: {}", role.time_unit());
                println!("Evidence: {}", role.require_evidence);
                println!("Approval required: {}", role.is_approval_required);
            });
        }
    };

    print_output(json, &roles, || {
        if roles.is_empty() {
            println!("No project roles found.");
        }
        for role in &roles {
            println!(
                "{:>5}  {:<24}  project {:>4}  remaining {:>6} of {:>6} {}",
                role.id,
                truncate_string(&role.name, 24),
                role.project_id,
                role.remaining,
                role.max_allowed,
                role.time_unit
            );
        }
    })
}

async fn handle_attachment_command(
    app: &App,
    config: &Config,
    principal: &Principal,
    command: AttachmentCommands,
    json: bool,
) -> Result<()> {
    match command {
        AttachmentCommands::Upload { file, mime_type } => {
            let mime_type = match mime_type {
                Some(mime_type) => mime_type,
                None => guess_mime_type(config, &file)?,
            };
            let bytes = fs::read(&file).with_context(|| format!("Could not read {}", file.display()))?;
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("attachment");
            let info = app
                .attachments
                .store_attachment(file_name, &mime_type, &bytes, principal)
                .await?;
            print_output(json, &info, || println!("✅ Attachment stored with id {}", info.id))
        }
        AttachmentCommands::Get { id, output } => {
            let attachment = app.attachments.get_attachment(id, principal).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(&attachment.info.file_name));
            fs::write(&path, &attachment.file)
                .with_context(|| format!("Could not write {}", path.display()))?;
            print_output(json, &attachment.info, || {
                println!("✅ {} written to {}", attachment.info.file_name, path.display())
            })
        }
    }
}

fn print_output<T: Serialize>(json: bool, value: &T, human: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human();
    }
    Ok(())
}
