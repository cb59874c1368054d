// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Line-oriented front end for the worksheet. Each line is one command for
//! the current step; the controller re-renders after every command.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::info;

use crate::config::Settings;
use crate::store::SessionStore;
use crate::views::converter::ConverterIntent;
use crate::views::finance::FinanceIntent;
use crate::views::identity::IdentityIntent;
use crate::views::review::ReviewIntent;
use crate::views::summary::SummaryIntent;
use crate::workflow::{Intent, Step, WorkflowController};

use super::{open_durable, rate_provider};

const SAVE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Intents(Vec<Intent>),
    Help,
    Quit,
}

pub fn handle(settings: &Settings) -> Result<()> {
    let durable = open_durable(settings)?;
    let session = SessionStore::new()?;
    let provider = rate_provider(settings)?;
    let mut ctl = WorkflowController::new(Box::new(session), Box::new(durable), provider, settings);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_loop(&mut ctl, stdin.lock(), &mut stdout, settings.http_timeout)
}

pub fn run_loop<R: BufRead, W: Write>(
    ctl: &mut WorkflowController,
    input: R,
    out: &mut W,
    settle_timeout: Duration,
) -> Result<()> {
    ctl.settle(settle_timeout);
    write!(out, "{}", ctl.render())?;
    prompt(ctl, out)?;
    for line in input.lines() {
        let line = line?;
        match parse_command(ctl.step(), &line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => writeln!(out, "{}", help_for(ctl.step()))?,
            Ok(Command::Intents(intents)) => {
                for intent in intents {
                    ctl.dispatch(intent);
                }
                if ctl.is_busy() {
                    write!(out, "{}", ctl.render())?;
                    wait_for_save(ctl);
                }
                ctl.settle(settle_timeout);
                write!(out, "{}", ctl.render())?;
            }
            Err(msg) => writeln!(out, "  ? {}", msg)?,
        }
        prompt(ctl, out)?;
    }
    info!("worksheet session ended");
    Ok(())
}

fn prompt<W: Write>(ctl: &WorkflowController, out: &mut W) -> Result<()> {
    write!(out, "{}> ", ctl.step())?;
    out.flush()?;
    Ok(())
}

fn wait_for_save(ctl: &mut WorkflowController) {
    while ctl.is_busy() {
        ctl.pump(Instant::now());
        if ctl.is_busy() {
            thread::sleep(SAVE_POLL);
        }
    }
}

fn row_number(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("'{}' is not an expense number", raw)),
    }
}

fn step_named(raw: &str) -> Option<Step> {
    Step::from_route(raw).or_else(|| Step::ALL.into_iter().find(|s| s.to_string() == raw))
}

pub fn parse_command(step: Step, line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let one = |i: Intent| Ok(Command::Intents(vec![i]));

    match head {
        "" => return Ok(Command::Intents(Vec::new())),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        "back" => return one(Intent::Back),
        "reset" => return one(Intent::Reset),
        "go" => {
            return step_named(rest)
                .map(|s| Command::Intents(vec![Intent::Navigate(s)]))
                .ok_or_else(|| format!("Unknown page '{}'", rest));
        }
        _ => {}
    }

    match (step, head) {
        (Step::Identity, "name") => one(Intent::Identity(IdentityIntent::SetName(rest.into()))),
        (Step::Identity, "email") => one(Intent::Identity(IdentityIntent::SetEmail(rest.into()))),
        (Step::Identity, "currency") => one(Intent::Identity(IdentityIntent::SelectCurrency(
            rest.to_uppercase(),
        ))),
        (Step::Identity, "submit" | "next") => one(Intent::Identity(IdentityIntent::Submit)),

        (Step::Finance, "income") => one(Intent::Finance(FinanceIntent::SetIncome(rest.into()))),
        (Step::Finance, "expense") => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let row = row_number(parts.next().unwrap_or(""))?;
            let field = parts.next().unwrap_or("");
            let text = parts.next().unwrap_or("").trim().to_string();
            match field {
                "name" => one(Intent::Finance(FinanceIntent::SetName { row, text })),
                "amount" => one(Intent::Finance(FinanceIntent::SetAmount { row, text })),
                _ => Err("usage: expense <n> name|amount <value>".into()),
            }
        }
        (Step::Finance, "info") => {
            let (field, value) = match rest.split_once(char::is_whitespace) {
                Some((f, v)) => (f, v.trim()),
                None => (rest, ""),
            };
            let intent = match field {
                "name" => IdentityIntent::SetName(value.into()),
                "email" => IdentityIntent::SetEmail(value.into()),
                "currency" => IdentityIntent::SelectCurrency(value.to_uppercase()),
                "update" => IdentityIntent::Submit,
                _ => return Err("usage: info name|email|currency <value>, info update".into()),
            };
            one(Intent::Finance(FinanceIntent::Info(intent)))
        }
        (Step::Finance, "add") => one(Intent::Finance(FinanceIntent::AddExpense)),
        (Step::Finance, "remove") => one(Intent::Finance(FinanceIntent::RemoveExpense(
            row_number(rest)?,
        ))),
        (Step::Finance, "submit" | "next") => one(Intent::Finance(FinanceIntent::Submit)),

        (Step::Summary, "review" | "next") => {
            one(Intent::Summary(SummaryIntent::ProceedToReview))
        }
        (Step::Summary, "convert" | "converter") => {
            one(Intent::Summary(SummaryIntent::OpenConverter))
        }

        (Step::Review, "edit") => match rest {
            "identity" | "user" => one(Intent::Review(ReviewIntent::Edit(Step::Identity))),
            "finance" => one(Intent::Review(ReviewIntent::Edit(Step::Finance))),
            _ => Err("usage: edit identity|finance".into()),
        },
        (Step::Review, "save") => one(Intent::Review(ReviewIntent::Save)),

        (Step::Converter, "amount") => {
            one(Intent::Converter(ConverterIntent::SetAmount(rest.into())))
        }
        (Step::Converter, "from") => one(Intent::Converter(ConverterIntent::SetFrom(
            rest.to_uppercase(),
        ))),
        (Step::Converter, "to") => one(Intent::Converter(ConverterIntent::SetTo(
            rest.to_uppercase(),
        ))),
        (Step::Converter, "convert") => one(Intent::Converter(ConverterIntent::Convert)),

        _ => Err(format!("Unknown command '{}' (try 'help')", head)),
    }
}

pub fn help_for(step: Step) -> String {
    let specific = match step {
        Step::Identity => "name <text>, email <text>, currency <CODE>, submit",
        Step::Finance => {
            "income <amount>, expense <n> name <text>, expense <n> amount <value>, add, remove <n>, submit\n\
             Update info: info name|email|currency <value>, info update"
        }
        Step::Summary => "review, convert",
        Step::Review => "edit identity|finance, save",
        Step::Converter => "amount <value>, from <CODE>, to <CODE>, convert",
    };
    format!(
        "Commands: {}\nAnywhere: back, go <page>, reset, help, quit",
        specific
    )
}
