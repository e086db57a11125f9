//! Interactive console: the event loop that hosts every component.
//!
//! One thread owns all state. Backend calls run on short-lived worker
//! threads and post a [`Completion`] back through the loop's channel; stdin
//! lines arrive on the same channel. Requests can therefore be in flight
//! side by side and resolve in any order, and each completion is checked for
//! relevance by the component that issued it.
//!
//! Every worker holds a [`Reply`] guard. If the worker dies without
//! reporting, the guard posts the request's fallback (an aborted network
//! failure), so a component waiting on it is always released.

pub mod command;
pub mod markdown;

use std::io::BufRead;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;

use crate::activity::ActivityLog;
use crate::api::{ApiError, Backend, ChatReply, Message, Report, Role, SearchResults, Session};
use crate::charts::{ChartRegistry, RenderOutcome, SlotId, TerminalSurface};
use crate::chat::{ChatCompletion, ChatOrchestrator, ChatRequest, Entry, RequestTicket, SendOutcome};
use crate::config::SentinelConfig;
use crate::nav::{Navigator, Screen, ScreenVisit};
use crate::report::{ReportPanel, ReportRunner, ReportTicket};
use crate::search::{SearchController, SearchPanel, SearchTicket};
use crate::session::{
    HistoryOutcome, HistoryTicket, ListingOutcome, ListingTicket, Selection, SessionManager,
};
use crate::utils::format::truncate;
use crate::views::{self, RefreshOutcome, ViewData};

use command::Command;

/// A backend result on its way back to the loop.
#[derive(Debug)]
pub enum Completion {
    View {
        visit: ScreenVisit,
        result: Result<ViewData, ApiError>,
    },
    Chat {
        ticket: RequestTicket,
        result: Result<ChatReply, ApiError>,
    },
    Sessions {
        ticket: ListingTicket,
        result: Result<Vec<Session>, ApiError>,
    },
    Created {
        result: Result<Session, ApiError>,
    },
    History {
        ticket: HistoryTicket,
        result: Result<Vec<Message>, ApiError>,
    },
    Search {
        ticket: SearchTicket,
        result: Result<SearchResults, ApiError>,
    },
    Report {
        ticket: ReportTicket,
        result: Result<Report, ApiError>,
    },
}

#[derive(Debug)]
pub enum Event {
    Input(String),
    InputClosed,
    Completed(Completion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Posts exactly one completion: the worker's, or the fallback on drop.
struct Reply {
    tx: Sender<Event>,
    fallback: Option<Completion>,
}

impl Reply {
    fn send(mut self, completion: Completion) {
        self.fallback = None;
        let _ = self.tx.send(Event::Completed(completion));
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            let _ = self.tx.send(Event::Completed(fallback));
        }
    }
}

pub struct Console {
    backend: Arc<dyn Backend>,
    config: SentinelConfig,
    log: ActivityLog,
    nav: Navigator,
    sessions: SessionManager,
    chat: ChatOrchestrator,
    charts: ChartRegistry<TerminalSurface>,
    search: SearchController,
    report: ReportRunner,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    pending: usize,
    input_closed: bool,
    show_listing: bool,
    printed: (u64, usize),
}

impl Console {
    pub fn new(backend: Arc<dyn Backend>, config: SentinelConfig, log: ActivityLog) -> Self {
        let (tx, rx) = mpsc::channel();

        let mut surface = TerminalSurface::new(config.display.bar_width);
        for screen in Screen::ALL {
            for (slot, heading) in views::slots(screen) {
                surface.add_panel(SlotId::new(*slot), heading, false);
            }
        }
        surface.add_panel(SlotId::dynamic(), "Chat Chart", false);

        Self {
            sessions: SessionManager::new(log.clone()),
            chat: ChatOrchestrator::new(config.chat.busy_policy, log.clone()),
            search: SearchController::new(&config.search, log.clone()),
            charts: ChartRegistry::new(surface),
            nav: Navigator::new(),
            report: ReportRunner::new(),
            backend,
            config,
            log,
            tx,
            rx,
            pending: 0,
            input_closed: false,
            show_listing: false,
            printed: (0, 0),
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn chat(&self) -> &ChatOrchestrator {
        &self.chat
    }

    pub fn charts(&self) -> &ChartRegistry<TerminalSurface> {
        &self.charts
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn report(&self) -> &ReportRunner {
        &self.report
    }

    /// Requests dispatched but not yet completed.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Show the dashboard and fetch the session list.
    pub fn start(&mut self) {
        println!("{}", "Sentinel: civic complaint investigation console".bold().cyan());
        println!("{}", "Type :help for commands; anything else goes to the chat.".dimmed());
        self.go("dashboard");
        self.refresh_sessions();
    }

    /// Run until `:quit` or end of input (after outstanding replies land).
    pub fn run(mut self) -> Result<()> {
        let input = self.tx.clone();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if input.send(Event::Input(line)).is_err() {
                    return;
                }
            }
            let _ = input.send(Event::InputClosed);
        });

        self.start();
        while let Ok(event) = self.rx.recv() {
            if self.handle(event) == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&self, timeout: Duration) -> Option<Event> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn handle(&mut self, event: Event) -> Flow {
        let flow = match event {
            Event::Input(line) => self.on_command(command::parse(&line)),
            Event::InputClosed => {
                self.input_closed = true;
                Flow::Continue
            }
            Event::Completed(completion) => {
                self.pending = self.pending.saturating_sub(1);
                self.on_completion(completion);
                Flow::Continue
            }
        };

        if flow == Flow::Quit || (self.input_closed && self.pending == 0) {
            Flow::Quit
        } else {
            Flow::Continue
        }
    }

    // -- commands -----------------------------------------------------------

    fn on_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Nothing => {}
            Command::Quit => return Flow::Quit,
            Command::Help => println!("{}", command::HELP),
            Command::Invalid(message) => println!("{}", message.yellow()),
            Command::Go(id) => self.go(&id),
            Command::Screens => self.print_screens(),
            Command::Sessions => {
                self.show_listing = true;
                self.refresh_sessions();
            }
            Command::New(name) => self.create_session(name),
            Command::Open(input) => self.open_session(&input),
            Command::Search { query, silenced } => self.start_search(&query, silenced),
            Command::Investigate => self.investigate(),
            Command::Panels => self.print_panels(),
            Command::Chat(message) => self.send_chat(&message),
        }
        Flow::Continue
    }

    fn go(&mut self, id: &str) {
        let Some(visit) = self.nav.select_screen(id) else {
            println!("{}", format!("Unknown screen '{id}'. Try :screens.").yellow());
            return;
        };

        println!();
        println!("{}", self.nav.title().bold().cyan());
        println!("{}", "=".repeat(60));

        match visit.screen {
            Screen::Chat => self.print_transcript(true),
            Screen::Search => self.print_search(),
            Screen::Investigate => self.print_report(),
            _ => {}
        }

        let backend = Arc::clone(&self.backend);
        let top_n = self.config.geography.top_n;
        if visit.screen.refreshes() {
            println!("{}", "Loading…".dimmed());
            self.spawn(
                Completion::View {
                    visit,
                    result: Err(ApiError::aborted()),
                },
                move || {
                    let result = views::fetch(backend.as_ref(), visit.screen, top_n)
                        .unwrap_or_else(|| Err(ApiError::aborted()));
                    Completion::View { visit, result }
                },
            );
        }
    }

    fn refresh_sessions(&mut self) {
        let ticket = self.sessions.begin_listing();
        let backend = Arc::clone(&self.backend);
        self.spawn(
            Completion::Sessions {
                ticket,
                result: Err(ApiError::aborted()),
            },
            move || Completion::Sessions {
                ticket,
                result: backend.sessions(),
            },
        );
    }

    fn create_session(&mut self, name: Option<String>) {
        let backend = Arc::clone(&self.backend);
        self.spawn(
            Completion::Created {
                result: Err(ApiError::aborted()),
            },
            move || Completion::Created {
                result: backend.create_session(name.as_deref()),
            },
        );
    }

    fn open_session(&mut self, input: &str) {
        let Some(id) = self.sessions.resolve(input) else {
            println!("{}", format!("No session matches '{input}'. Try :sessions.").yellow());
            return;
        };

        let before = self.sessions.conversation();
        let selection = self.sessions.select(&id);
        if self.sessions.conversation() != before {
            self.rebind_chat();
        }
        match selection {
            Selection::Fresh(_) => println!("{}", "Started a fresh conversation.".green()),
            Selection::LoadHistory(ticket) => {
                println!("{}", format!("Opening session {id}…").dimmed());
                let backend = Arc::clone(&self.backend);
                self.spawn(
                    Completion::History {
                        ticket: ticket.clone(),
                        result: Err(ApiError::aborted()),
                    },
                    move || {
                        let result = backend.history(&ticket.session);
                        Completion::History { ticket, result }
                    },
                );
            }
        }
    }

    /// The chat now belongs to another conversation; its chart goes with the
    /// old one.
    fn rebind_chat(&mut self) {
        self.chat.rebind();
        self.charts.clear(&SlotId::dynamic());
        self.printed = (self.chat.transcript().revision(), 0);
    }

    fn start_search(&mut self, query: &str, silenced: bool) {
        if let Some((ticket, query)) = self.search.search(query, silenced) {
            let backend = Arc::clone(&self.backend);
            self.spawn(
                Completion::Search {
                    ticket,
                    result: Err(ApiError::aborted()),
                },
                move || Completion::Search {
                    ticket,
                    result: backend.search(&query),
                },
            );
        }
        self.print_search();
    }

    fn investigate(&mut self) {
        let Some(ticket) = self.report.trigger() else {
            println!("{}", "An investigation is already running.".yellow());
            return;
        };
        println!(
            "{}",
            "Running full investigation. This can take several minutes…".dimmed()
        );
        let backend = Arc::clone(&self.backend);
        self.spawn(
            Completion::Report {
                ticket,
                result: Err(ApiError::aborted()),
            },
            move || Completion::Report {
                ticket,
                result: backend.investigate(),
            },
        );
    }

    fn send_chat(&mut self, message: &str) {
        match self.chat.send(&self.sessions, message) {
            SendOutcome::Ignored => {}
            SendOutcome::Dispatched(request) => self.dispatch_chat(request),
            SendOutcome::Queued { position } => println!(
                "{}",
                format!("Queued (#{position}); it will be sent after the current reply.").dimmed()
            ),
            SendOutcome::Rejected => {
                println!("{}", "Please wait for the current reply.".yellow())
            }
        }
    }

    fn dispatch_chat(&mut self, request: ChatRequest) {
        self.chat.dispatched(&request.ticket);
        self.print_transcript(false);
        println!("{}", "  … analysing".dimmed());

        let backend = Arc::clone(&self.backend);
        let ticket = request.ticket;
        self.spawn(
            Completion::Chat {
                ticket,
                result: Err(ApiError::aborted()),
            },
            move || Completion::Chat {
                ticket,
                result: backend.chat(&request.message, request.session_id.as_ref()),
            },
        );
    }

    /// Run `job` on a worker; `fallback` is posted if it never reports.
    fn spawn<F>(&mut self, fallback: Completion, job: F)
    where
        F: FnOnce() -> Completion + Send + 'static,
    {
        self.pending += 1;
        let reply = Reply {
            tx: self.tx.clone(),
            fallback: Some(fallback),
        };
        thread::spawn(move || {
            let completion = job();
            reply.send(completion);
        });
    }

    // -- completions --------------------------------------------------------

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::View { visit, result } => {
                match views::apply(&self.nav, &visit, &mut self.charts, result, &self.log) {
                    RefreshOutcome::Shown(report) => {
                        for line in &report.summary {
                            println!("  {line}");
                        }
                        for slot in &report.rendered {
                            self.print_panel(slot);
                        }
                        for (slot, e) in &report.failed {
                            println!("{}", format!("  {slot}: {e}").red());
                        }
                    }
                    RefreshOutcome::Failed(e) => {
                        println!("{}", format!("Could not load {}: {e}", visit.screen).red())
                    }
                    RefreshOutcome::Stale => {}
                }
            }
            Completion::Chat { ticket, result } => {
                let outcome =
                    self.chat
                        .complete(&mut self.sessions, &mut self.charts, ticket, result);
                if let ChatCompletion::Applied(effects) = outcome {
                    self.print_transcript(false);
                    if effects.chart == Some(RenderOutcome::Rendered) {
                        self.print_panel(&SlotId::dynamic());
                    }
                    if effects.refresh_sessions {
                        self.refresh_sessions();
                    }
                    if let Some(next) = effects.next {
                        self.dispatch_chat(next);
                    }
                }
            }
            Completion::Sessions { ticket, result } => {
                match self.sessions.apply_listing(ticket, result) {
                    ListingOutcome::Updated(_) if self.show_listing => {
                        self.show_listing = false;
                        self.print_sessions();
                    }
                    ListingOutcome::Failed(e) if self.show_listing => {
                        self.show_listing = false;
                        println!("{}", format!("Could not list sessions: {e}").red());
                    }
                    _ => {}
                }
            }
            Completion::Created { result } => match self.sessions.on_created(result) {
                Ok(session) => {
                    self.rebind_chat();
                    println!(
                        "{}",
                        format!("Session '{}' ({}) is now current.", session.display_name, session.id)
                            .green()
                    );
                    self.refresh_sessions();
                }
                Err(e) => println!("{}", format!("Could not create session: {e}").red()),
            },
            Completion::History { ticket, result } => {
                match self.sessions.on_history(&ticket, result) {
                    HistoryOutcome::Loaded(messages) => {
                        self.chat.load_history(messages);
                        self.print_transcript(true);
                    }
                    HistoryOutcome::Failed(e) => {
                        self.chat
                            .push_error(format!("Could not load session history: {e}"));
                        self.print_transcript(false);
                    }
                    HistoryOutcome::Stale => {}
                }
            }
            Completion::Search { ticket, result } => {
                if self.search.complete(ticket, result) {
                    self.print_search();
                }
            }
            Completion::Report { ticket, result } => {
                self.report.complete(ticket, result);
                self.print_report();
            }
        }
    }

    // -- output -------------------------------------------------------------

    fn print_screens(&self) {
        for screen in Screen::ALL {
            let marker = if self.nav.active() == Some(screen) { "▸" } else { " " };
            println!("  {marker} {:<14} {}", screen.id(), screen.title().dimmed());
        }
    }

    fn print_sessions(&self) {
        let current = self.sessions.current();
        for (i, session) in self.sessions.list().iter().enumerate() {
            let marker = if current == Some(&session.id) { "▸" } else { " " };
            let created = session.created_at.as_deref().unwrap_or("");
            println!(
                "  {marker} {i:>3}  {:<32} {}",
                truncate(&session.display_name, 32),
                created.dimmed()
            );
        }
    }

    fn print_panel(&self, slot: &SlotId) {
        let surface = self.charts.surface();
        let Some(lines) = surface.lines(slot) else {
            return;
        };
        println!();
        for line in lines {
            println!("{line}");
        }
    }

    fn print_panels(&self) {
        let visible = self.charts.surface().visible_slots();
        if visible.is_empty() {
            println!("{}", "No charts on display.".dimmed());
            return;
        }
        for (slot, heading) in visible {
            println!("{}", format!("[{heading}]").dimmed());
            self.print_panel(slot);
        }
    }

    /// Print transcript entries not yet shown; everything if `full` or the
    /// transcript was replaced.
    fn print_transcript(&mut self, full: bool) {
        let transcript = self.chat.transcript();
        let settled: Vec<&Entry> = transcript
            .entries()
            .iter()
            .filter(|e| !matches!(e, Entry::Typing))
            .collect();

        let start = if full || self.printed.0 != transcript.revision() {
            0
        } else {
            self.printed.1.min(settled.len())
        };
        for entry in &settled[start..] {
            print_entry(entry);
        }
        self.printed = (transcript.revision(), settled.len());
    }

    fn print_search(&self) {
        match self.search.panel() {
            SearchPanel::Idle => {
                println!("{}", "Search with :search [--silenced] <text>".dimmed())
            }
            SearchPanel::Prompt => {
                println!("{}", "Enter a search query: :search [--silenced] <text>".yellow())
            }
            SearchPanel::Loading { query } => {
                println!("{}", format!("Searching for '{query}'…").dimmed())
            }
            SearchPanel::Empty { query } => {
                println!("{}", format!("No complaints matched '{query}'.").yellow())
            }
            SearchPanel::Error(e) => println!("{}", format!("Search failed: {e}").red()),
            SearchPanel::Populated(results) => print_results(results),
        }
    }

    fn print_report(&self) {
        match self.report.panel() {
            ReportPanel::Hidden => {
                println!("{}", "Run :investigate to generate a full report.".dimmed())
            }
            ReportPanel::Running => println!("{}", "Investigation in progress…".dimmed()),
            ReportPanel::Error(e) => println!("{}", format!("Investigation failed: {e}").red()),
            ReportPanel::Shown(report) => {
                println!();
                for line in markdown::render(&report.report) {
                    println!("{line}");
                }
                if let Some(file) = &report.report_file {
                    println!("{}", format!("Saved to {file}").dimmed());
                }
            }
        }
    }
}

fn print_entry(entry: &Entry) {
    match entry {
        Entry::Message(m) => match m.role {
            Role::User => println!("{} {}", "you ›".bold().green(), m.content),
            Role::Assistant => {
                println!("{}", "sentinel ›".bold().cyan());
                for line in markdown::render(&m.content) {
                    println!("  {line}");
                }
            }
            Role::System => println!("{}", format!("· {}", m.content).dimmed()),
        },
        Entry::Error(e) => println!("{} {}", "sentinel ›".bold().red(), e.red()),
        Entry::Notice(n) => println!("{}", format!("  ({n})").dimmed()),
        Entry::Typing => {}
    }
}

pub fn print_results(results: &SearchResults) {
    println!(
        "{}",
        format!("{} result(s) for '{}'", results.results.len(), results.query).bold()
    );
    println!(
        "  {:<3} {:>6} {:<18} {:<12} {}",
        "#".dimmed(),
        "Score".dimmed(),
        "Category".dimmed(),
        "Ward".dimmed(),
        "Complaint".dimmed()
    );
    for (i, r) in results.results.iter().enumerate() {
        let score = format!("{:>6.1}", r.silence_score);
        let score = if r.silence_score >= 70.0 {
            score.red()
        } else {
            score.normal()
        };
        println!(
            "  {:<3} {} {:<18} {:<12} {}",
            i + 1,
            score,
            truncate(&r.category, 18),
            truncate(&r.ward, 12),
            truncate(&r.text, 60)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_reply_posts_fallback() {
        let (tx, rx) = mpsc::channel();
        let reply = Reply {
            tx,
            fallback: Some(Completion::Created {
                result: Err(ApiError::aborted()),
            }),
        };
        drop(reply);
        assert!(matches!(
            rx.try_recv(),
            Ok(Event::Completed(Completion::Created { result: Err(_) }))
        ));
    }

    #[test]
    fn sent_reply_posts_once() {
        let (tx, rx) = mpsc::channel();
        let reply = Reply {
            tx,
            fallback: Some(Completion::Created {
                result: Err(ApiError::aborted()),
            }),
        };
        reply.send(Completion::Created {
            result: Err(ApiError::BackendError("x".into())),
        });
        assert!(matches!(
            rx.try_recv(),
            Ok(Event::Completed(Completion::Created {
                result: Err(ApiError::BackendError(_))
            }))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn panicking_worker_still_completes() {
        let (tx, rx) = mpsc::channel();
        let reply = Reply {
            tx,
            fallback: Some(Completion::Created {
                result: Err(ApiError::aborted()),
            }),
        };
        let handle = thread::spawn(move || {
            let _reply = reply;
            panic!("worker blew up");
        });
        assert!(handle.join().is_err());
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(1)),
            Ok(Event::Completed(Completion::Created { result: Err(e) })) if e == ApiError::aborted()
        ));
    }
}
