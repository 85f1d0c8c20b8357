use std::path::PathBuf;
use std::process::ExitCode;

use bill_capture_client::logging::init_cli_logging;
use bill_capture_client::report::{
    render_bill_detail, render_bill_list, render_dashboard, render_periods,
};
use bill_capture_client::{ApiClient, ClientError};
use bill_capture_core::analytics::{dashboard, grouped_expenses, PeriodView};
use bill_capture_core::dates::today_utc;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "billctl", about = "Upload receipts and inspect spending")]
struct Cli {
    #[command(flatten)]
    connection: Connection,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Connection {
    /// Base URL of the deployed API stage.
    #[arg(long, env = "BILL_API_URL", global = true)]
    api_url: Option<String>,
    /// Session token printed by `billctl login`.
    #[arg(long, env = "BILL_API_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,
    /// Owner id used when no token is given.
    #[arg(long, env = "BILL_USER_ID", global = true)]
    user_id: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },
    /// Sign in and print a session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Upload a receipt image or PDF for processing.
    Upload { path: PathBuf },
    /// List bills, newest first.
    List,
    /// Show one bill.
    Show {
        bill_id: String,
        /// Show extracted fields and categorized items instead of file metadata.
        #[arg(long)]
        data: bool,
    },
    /// Spending dashboard and per-period breakdown.
    Analytics {
        #[arg(long, value_enum, default_value_t = View::Week)]
        view: View,
        /// Reference date (YYYY-MM-DD); defaults to today (UTC).
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    Week,
    Month,
}

impl From<View> for PeriodView {
    fn from(view: View) -> Self {
        match view {
            View::Week => PeriodView::Week,
            View::Month => PeriodView::Month,
        }
    }
}

fn main() -> ExitCode {
    init_cli_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, ClientError> {
    let Connection {
        api_url,
        token,
        user_id,
    } = cli.connection;
    let client = ApiClient::new(&require_api_url(api_url)?)?.with_token(token);
    let user_id = user_id.as_deref();

    match cli.command {
        Command::Register {
            email,
            password,
            name,
        } => {
            let user = client.register(&email, &password, &name)?;
            Ok(format!("Registered {} ({})\n", user.email, user.user_id))
        }
        Command::Login { email, password } => {
            let session = client.login(&email, &password)?;
            Ok(format!(
                "Logged in as {} ({})\nexport BILL_API_TOKEN={}\n",
                session.user.email, session.user.user_id, session.token
            ))
        }
        Command::Upload { path } => {
            let accepted = client.upload(&path, user_id)?;
            Ok(format!(
                "Uploaded {} as bill {} ({})\n",
                accepted.filename,
                accepted.bill_id,
                accepted.status.as_str()
            ))
        }
        Command::List => Ok(render_bill_list(&client.fetch_bills(user_id)?)),
        Command::Show { bill_id, data } => {
            if data {
                Ok(render_bill_detail(&client.fetch_bill_data(&bill_id)))
            } else {
                let basic = client.fetch_bill(&bill_id)?;
                serde_json::to_string_pretty(&basic)
                    .map(|text| format!("{text}\n"))
                    .map_err(|error| ClientError::InvalidResponse(error.to_string()))
            }
        }
        Command::Analytics { view, today } => {
            let today = today.unwrap_or_else(today_utc);
            let bills = client.fetch_bills(user_id)?;
            let mut output = render_dashboard(&dashboard(&bills, today));
            output.push('\n');
            output.push_str(&render_periods(&grouped_expenses(&bills, view.into(), today)));
            Ok(output)
        }
    }
}

fn require_api_url(api_url: Option<String>) -> Result<String, ClientError> {
    api_url
        .filter(|url| !url.trim().is_empty())
        .ok_or(ClientError::MissingSetting {
            setting: "API URL",
            flag: "api-url",
            env: "BILL_API_URL",
        })
}
