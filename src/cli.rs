//! Parsing for the interactive shell.
//!
//! One line of input becomes one [`Request`]. Argument counts and values
//! are validated here; nothing touches the queue until a request parses.

use crate::bench::BenchmarkSpec;
use crate::error::{BatchError, Result};
use crate::scheduler::Policy;
use crate::shutdown::DrainMode;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Run {
        name: String,
        burst: i64,
        priority: i32,
    },
    List,
    ChangePolicy(Policy),
    Report,
    Test(BenchmarkSpec),
    Quit(DrainMode),
    Help,
}

pub const HELP: &str = "\
run <job> <burst> <priority>  submit a job
list                          show finished, running and pending jobs
fcfs | sjf | priority         change the scheduling policy
report                        print performance metrics
test <benchmark> <policy> <num_jobs> <arrival_rate> <priority_levels> <min_burst> <max_burst>
                              run a synthetic benchmark
quit [-i|-c|-a]               exit: immediately, after the current job, or after all jobs
help                          print this menu";

const RUN_USAGE: &str = "run <job> <burst> <priority>";
const TEST_USAGE: &str =
    "test <benchmark> <policy> <num_jobs> <arrival_rate> <priority_levels> <min_burst> <max_burst>";

fn number<T: std::str::FromStr>(value: &str, what: &str, usage: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| BatchError::Usage(format!("{} (invalid {}: '{}')", usage, what, value)))
}

/// Parse one line of shell input. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Request>> {
    let args: Vec<&str> = line.split_whitespace().collect();
    let Some((&cmd, rest)) = args.split_first() else {
        return Ok(None);
    };

    let request = match cmd.to_ascii_lowercase().as_str() {
        "run" | "r" => match rest {
            [name, burst, priority] => Request::Run {
                name: name.to_string(),
                burst: number(burst, "burst", RUN_USAGE)?,
                priority: number(priority, "priority", RUN_USAGE)?,
            },
            _ => return Err(BatchError::Usage(RUN_USAGE.to_string())),
        },
        "list" | "ls" => Request::List,
        "fcfs" | "sjf" | "priority" => {
            if !rest.is_empty() {
                return Err(BatchError::Usage(format!("{} takes no arguments", cmd)));
            }
            Request::ChangePolicy(cmd.parse()?)
        }
        "policy" => match rest {
            [name] => Request::ChangePolicy(name.parse()?),
            _ => return Err(BatchError::Usage("policy <fcfs|sjf|priority>".to_string())),
        },
        "report" => Request::Report,
        "test" => match rest {
            [name, policy, num_jobs, arrival_rate, levels, min_burst, max_burst] => {
                Request::Test(BenchmarkSpec {
                    name: name.to_string(),
                    policy: policy.parse()?,
                    num_jobs: number(num_jobs, "num_jobs", TEST_USAGE)?,
                    arrival_rate: number(arrival_rate, "arrival_rate", TEST_USAGE)?,
                    priority_levels: number(levels, "priority_levels", TEST_USAGE)?,
                    min_burst: number(min_burst, "min_burst", TEST_USAGE)?,
                    max_burst: number(max_burst, "max_burst", TEST_USAGE)?,
                    seed: None,
                })
            }
            _ => return Err(BatchError::Usage(TEST_USAGE.to_string())),
        },
        "quit" | "q" => match rest {
            [] => Request::Quit(DrainMode::default()),
            [mode] => Request::Quit(mode.parse()?),
            _ => return Err(BatchError::Usage("quit [-i|-c|-a]".to_string())),
        },
        "help" | "h" | "?" => Request::Help,
        other => {
            return Err(BatchError::Usage(format!(
                "{}: command not found, type 'help' for the menu",
                other
            )))
        }
    };
    Ok(Some(request))
}
