use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use course_portal::config::{get_configuration, Settings};
use course_portal::handlers::auth::{LoginView, RegisterView};
use course_portal::handlers::student::StudentDashboard;
use course_portal::handlers::teacher::{CourseForm, TeacherDashboard};
use course_portal::handlers::ViewStatus;
use course_portal::middleware::auth::GuardDecision;
use course_portal::models::{Course, CourseDraft, EnrollmentRequest, Role};
use course_portal::routes::Route;
use course_portal::startup::build_portal;
use course_portal::utils::jwt::decode_claims;
use course_portal::PortalState;
use portal_core::observability::init_tracing;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "course-portal", about = "Course enrollment client")]
struct Cli {
    /// Override the API base URL from configuration.
    #[arg(long, env = "COURSE_PORTAL_API_URL")]
    api_url: Option<String>,

    /// Override the session file location.
    #[arg(long, env = "COURSE_PORTAL_SESSION")]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register(RegisterArgs),
    Login {
        username: String,
        #[arg(long, env = "COURSE_PORTAL_PASSWORD")]
        password: String,
    },
    Logout,
    /// Fetch the profile of the logged-in user from the server.
    Whoami,
    /// Show the locally stored session.
    Status,
    Courses(CoursesCommand),
    Requests(RequestsCommand),
    /// Open the dashboard for the current role.
    Dashboard,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Student,
    Teacher,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Student => Role::Student,
            RoleArg::Teacher => Role::Teacher,
        }
    }
}

#[derive(Args, Debug)]
struct RegisterArgs {
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "COURSE_PORTAL_PASSWORD")]
    password: String,
    /// Confirmation; defaults to `--password`.
    #[arg(long)]
    password2: Option<String>,
    #[arg(long, value_enum, default_value = "student")]
    role: RoleArg,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
}

#[derive(Args, Debug)]
struct CoursesCommand {
    #[command(subcommand)]
    command: CoursesSubcommand,
}

#[derive(Subcommand, Debug)]
enum CoursesSubcommand {
    List,
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        max_capacity: Option<u32>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        max_capacity: Option<u32>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct RequestsCommand {
    #[command(subcommand)]
    command: RequestsSubcommand,
}

#[derive(Subcommand, Debug)]
enum RequestsSubcommand {
    List,
    /// Apply for a course as the logged-in student.
    Apply {
        course_id: i64,
    },
    /// Approve a pending request as the logged-in teacher.
    Approve {
        request_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow!("Configuration error: {}", e)
    })?;
    apply_overrides(&mut settings, &cli);

    init_tracing(
        "course-portal",
        &settings.telemetry.log_level,
        settings.telemetry.otlp_endpoint.as_deref(),
    );

    let state = build_portal(&settings).context("Failed to initialise session")?;

    match cli.command {
        Command::Register(args) => register(&state, args).await,
        Command::Login { username, password } => login(&state, username, password).await,
        Command::Logout => {
            state.auth.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            let user = state.users.fetch_current_user().await?;
            println!(
                "{} <{}> [{}] id={}",
                user.display_name(),
                user.email,
                user.raw_role,
                user.id
            );
            Ok(())
        }
        Command::Status => {
            status(&state);
            Ok(())
        }
        Command::Courses(cmd) => courses(&state, cmd.command).await,
        Command::Requests(cmd) => requests(&state, cmd.command).await,
        Command::Dashboard => dashboard(&state).await,
    }
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(url) = &cli.api_url {
        settings.api.base_url = url.clone();
    }
    if let Some(path) = &cli.session {
        settings.session.path = path.clone();
    }
}

/// Turn a view's error message into the command's failure.
fn finish(status: &ViewStatus) -> anyhow::Result<()> {
    if let Some(error) = &status.error_message {
        bail!("{}", error);
    }
    if let Some(success) = &status.success_message {
        println!("{}", success);
    }
    Ok(())
}

async fn register(state: &PortalState, args: RegisterArgs) -> anyhow::Result<()> {
    let mut view = RegisterView::blank(args.role.into());
    view.form.username = args.username;
    view.form.email = args.email;
    view.form.password2 = args.password2.unwrap_or_else(|| args.password.clone());
    view.form.password = args.password;
    view.form.first_name = args.first_name;
    view.form.last_name = args.last_name;

    view.submit(&state.auth).await;
    finish(&view.status)
}

async fn login(state: &PortalState, username: String, password: String) -> anyhow::Result<()> {
    let mut view = LoginView::new(username, password);
    match view.submit(&state.auth).await {
        Some(route) => {
            let name = state
                .auth
                .current_user()
                .map(|u| u.display_name())
                .unwrap_or_default();
            println!("Logged in as {} ({})", name, route);
            Ok(())
        }
        None => finish(&view.status),
    }
}

fn status(state: &PortalState) {
    let Some(token) = state.auth.access_token() else {
        println!("Not logged in");
        return;
    };

    match state.auth.current_user() {
        Some(user) => println!("User:    {} [{}]", user.display_name(), user.raw_role),
        None => println!("User:    unknown"),
    }

    match decode_claims(&token) {
        Ok(claims) => {
            let expired = claims.is_expired_at(Utc::now());
            match claims.expires_at() {
                Some(at) if expired => println!("Access:  expired at {}", at),
                Some(at) => println!("Access:  valid until {}", at),
                None => println!("Access:  unknown expiry"),
            }
        }
        Err(e) => println!("Access:  unreadable token ({})", e),
    }

    let refresh = if state.auth.has_refresh_token() {
        "present"
    } else {
        "missing"
    };
    println!("Refresh: {}", refresh);
}

async fn courses(state: &PortalState, cmd: CoursesSubcommand) -> anyhow::Result<()> {
    match cmd {
        CoursesSubcommand::List => {
            for course in state.courses.list().await? {
                print_course(&course);
            }
            Ok(())
        }
        CoursesSubcommand::Show { id } => {
            let course = state.courses.get(id).await?;
            print_course(&course);
            if !course.description.is_empty() {
                println!("    {}", course.description);
            }
            Ok(())
        }
        CoursesSubcommand::Create {
            name,
            code,
            description,
            max_capacity,
        } => {
            let mut view = TeacherDashboard::new(state);
            let mut form = CourseForm {
                name,
                code,
                description,
                ..CourseForm::default()
            };
            if let Some(max_capacity) = max_capacity {
                form.max_capacity = max_capacity;
            }
            view.course_form = form;
            // Failures are recorded on the view status
            let _ = view.create_course().await;
            finish(&view.status)
        }
        CoursesSubcommand::Update {
            id,
            name,
            code,
            description,
            max_capacity,
        } => {
            let current = state.courses.get(id).await?;
            let mut draft = CourseDraft::from_course(&current);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(code) = code {
                draft.code = code;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(max_capacity) = max_capacity {
                draft.max_capacity = max_capacity;
            }

            let mut view = TeacherDashboard::new(state);
            let _ = view.update_course(id, &draft).await;
            finish(&view.status)
        }
        CoursesSubcommand::Delete { id } => {
            let mut view = TeacherDashboard::new(state);
            let _ = view.delete_course(id).await;
            finish(&view.status)
        }
    }
}

async fn requests(state: &PortalState, cmd: RequestsSubcommand) -> anyhow::Result<()> {
    match cmd {
        RequestsSubcommand::List => {
            for request in state.enrollments.list().await? {
                print_request(&request);
            }
            Ok(())
        }
        RequestsSubcommand::Apply { course_id } => {
            let mut view = StudentDashboard::new(state);
            view.load().await;
            let Some(course) = view
                .available_courses
                .iter()
                .find(|c| c.id == course_id)
                .cloned()
            else {
                finish(&view.status)?;
                bail!("Course {} not found", course_id);
            };
            let _ = view.apply_for_course(&course).await;
            finish(&view.status)
        }
        RequestsSubcommand::Approve { request_id } => {
            let mut view = TeacherDashboard::new(state);
            view.load().await;
            let Some(request) = view
                .enrollment_requests
                .iter()
                .find(|r| r.id == request_id)
                .cloned()
            else {
                finish(&view.status)?;
                bail!("Enrollment request {} not found", request_id);
            };
            let _ = view.approve_enrollment(&request).await;
            finish(&view.status)
        }
    }
}

async fn dashboard(state: &PortalState) -> anyhow::Result<()> {
    let route = Route::dashboard_for(state.auth.role());
    let route = match state.guard.navigate(route) {
        GuardDecision::Allow => route,
        GuardDecision::Redirect(target) => target,
    };

    match route {
        Route::StudentDashboard => {
            let mut view = StudentDashboard::new(state);
            view.load().await;
            finish(&view.status)?;
            println!("Available courses:");
            for course in &view.available_courses {
                let marker = match view.enrollment_status(course.id) {
                    Some(status) => status.to_string(),
                    None if StudentDashboard::is_course_available(course) => "open".to_string(),
                    None => "full".to_string(),
                };
                print!("[{:>8}] ", marker);
                print_course(course);
            }
            println!("My requests:");
            for request in &view.my_enrollments {
                print_request(request);
            }
            Ok(())
        }
        Route::TeacherDashboard => {
            let mut view = TeacherDashboard::new(state);
            view.load().await;
            finish(&view.status)?;
            println!("Courses:");
            for course in &view.courses {
                print!("[{:>2} pending] ", view.pending_requests_for_course(course.id));
                print_course(course);
            }
            println!("Enrollment requests:");
            for request in &view.enrollment_requests {
                print_request(request);
            }
            Ok(())
        }
        Route::Login | Route::Register => bail!("Not logged in. Run `course-portal login` first."),
    }
}

fn print_course(course: &Course) {
    println!(
        "{:>4}  {:<10} {:<32} {}/{}",
        course.id, course.code, course.name, course.enrolled_count, course.max_capacity
    );
}

fn print_request(request: &EnrollmentRequest) {
    let course = request
        .course_detail
        .as_ref()
        .map(|c| c.code.clone())
        .unwrap_or_else(|| format!("course {}", request.course_id));
    let waitlist = if request.is_waitlisted { " (waitlisted)" } else { "" };
    println!(
        "{:>4}  {:<10} {:<20} {}{}  {}",
        request.id,
        course,
        request.student_label(),
        request.status,
        waitlist,
        request.created_at.format("%Y-%m-%d %H:%M")
    );
}
