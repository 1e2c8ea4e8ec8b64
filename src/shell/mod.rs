//! Embedded command shell.
//!
//! Text commands map one-to-one onto simulation commands. Output comes back
//! as tagged lines so the overlay can colour them.

use thiserror::Error;

use crate::sim::model::{Priority, ProcessState, StressMode};
use crate::sim::ring::RingBuffer;
use crate::sim::{Command, SimError, Simulation};
use crate::ui::format;

const SCROLLBACK: usize = 500;
const INPUT_HISTORY: usize = 50;
const DEFAULT_PS_ROWS: usize = 15;
const NETSTAT_ROWS: usize = 20;
const USER: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Input,
    Output,
    Error,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLine {
    pub kind: LineKind,
    pub text: String,
}

impl TerminalLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn output(text: impl Into<String>) -> Self {
        Self::new(LineKind::Output, text)
    }
}

#[derive(Debug, Error, PartialEq)]
enum ShellError {
    #[error("{0}: command not found")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{0}: arguments must be process ids")]
    InvalidPid(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Interactive shell state: scrollback, input line and input history.
#[derive(Debug)]
pub struct Shell {
    lines: RingBuffer<TerminalLine>,
    history: RingBuffer<String>,
    history_cursor: Option<usize>,
    pub input: String,
}

impl Shell {
    pub fn new() -> Self {
        let mut lines = RingBuffer::new(SCROLLBACK);
        lines.push(TerminalLine::new(
            LineKind::Info,
            "simtop shell. Type 'help' for available commands.",
        ));
        Self {
            lines,
            history: RingBuffer::new(INPUT_HISTORY),
            history_cursor: None,
            input: String::new(),
        }
    }

    /// Scrollback, oldest first.
    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &TerminalLine> + '_ {
        self.lines.iter()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn prompt(sim: &Simulation) -> String {
        format!("{}@{}:~$", USER, sim.config().display.hostname)
    }

    /// Run the current input line and clear it.
    pub fn submit(&mut self, sim: &mut Simulation) -> Vec<TerminalLine> {
        let line = std::mem::take(&mut self.input);
        self.execute(&line, sim)
    }

    /// Step back through input history.
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let cursor = match self.history_cursor {
            Some(0) => 0,
            Some(i) => i - 1,
            None => self.history.len() - 1,
        };
        self.history_cursor = Some(cursor);
        if let Some(entry) = self.history.get(cursor) {
            self.input = entry.clone();
        }
    }

    pub fn history_next(&mut self) {
        match self.history_cursor {
            Some(i) if i + 1 < self.history.len() => {
                self.history_cursor = Some(i + 1);
                if let Some(entry) = self.history.get(i + 1) {
                    self.input = entry.clone();
                }
            }
            _ => {
                self.history_cursor = None;
                self.input.clear();
            }
        }
    }

    /// Execute one command line against the simulation.
    ///
    /// Returns the lines produced, which are also appended to the scrollback.
    pub fn execute(&mut self, line: &str, sim: &mut Simulation) -> Vec<TerminalLine> {
        let line = line.trim();
        self.history_cursor = None;
        if line.is_empty() {
            return Vec::new();
        }

        if self.history.latest().map(String::as_str) != Some(line) {
            self.history.push(line.to_string());
        }

        let mut produced = vec![TerminalLine::new(
            LineKind::Input,
            format!("{} {}", Self::prompt(sim), line),
        )];

        let words: Vec<&str> = line.split_whitespace().collect();
        if words[0] == "clear" {
            self.lines.clear();
            return Vec::new();
        }

        tracing::debug!(command = %line, "shell command");
        match run(&words, sim) {
            Ok(lines) => produced.extend(lines),
            Err(err) => produced.push(TerminalLine::new(LineKind::Error, err.to_string())),
        }

        self.lines.extend(produced.iter().cloned());
        produced
    }
}

fn run(words: &[&str], sim: &mut Simulation) -> Result<Vec<TerminalLine>, ShellError> {
    let (command, args) = match words.split_first() {
        Some((command, args)) => (*command, args),
        None => return Ok(Vec::new()),
    };

    match command {
        "help" => Ok(help()),
        "ps" => {
            let rows = match args.first() {
                Some(n) => n
                    .parse()
                    .map_err(|_| ShellError::InvalidArgument(format!("ps: invalid count '{}'", n)))?,
                None => DEFAULT_PS_ROWS,
            };
            Ok(ps(sim, rows))
        }
        "top" => Ok(top(sim)),
        "kill" => {
            let pids = parse_pids("kill", args, "kill <pid>...")?;
            let mut lines = Vec::new();
            for pid in pids {
                lines.push(command_line(sim.apply(Command::Kill(pid))));
            }
            Ok(lines)
        }
        "renice" => {
            let [pid, priority] = args else {
                return Err(ShellError::Usage("renice <pid> <low|normal|high|realtime>"));
            };
            let pid = parse_pid("renice", pid)?;
            let priority: Priority = priority.parse().map_err(ShellError::InvalidArgument)?;
            Ok(vec![command_line(sim.apply(Command::Renice { pid, priority }))])
        }
        "stop" | "cont" => {
            let pids = parse_pids(command, args, "stop|cont <pid>...")?;
            Ok(pids
                .into_iter()
                .map(|pid| {
                    let cmd = if command == "stop" {
                        Command::Stop(pid)
                    } else {
                        Command::Resume(pid)
                    };
                    command_line(sim.apply(cmd))
                })
                .collect())
        }
        "systemctl" => systemctl(args, sim),
        "stress" => match args.first() {
            None => Ok(vec![TerminalLine::new(
                LineKind::Info,
                format!("stress mode: {}", sim.stress_mode()),
            )]),
            Some(mode) => {
                let mode: StressMode = mode.parse().map_err(ShellError::InvalidArgument)?;
                Ok(vec![command_line(sim.apply(Command::SetStressMode(mode)))])
            }
        },
        "stats" => Ok(stats(sim)),
        "df" => Ok(df(sim)),
        "netstat" => Ok(netstat(sim)),
        "uptime" => Ok(vec![TerminalLine::output(uptime(sim))]),
        "whoami" => Ok(vec![TerminalLine::output(USER)]),
        other => Err(ShellError::UnknownCommand(other.to_string())),
    }
}

fn command_line(result: Result<String, SimError>) -> TerminalLine {
    match result {
        Ok(message) => TerminalLine::new(LineKind::Success, message),
        Err(err) => TerminalLine::new(LineKind::Error, err.to_string()),
    }
}

fn parse_pid(command: &str, arg: &str) -> Result<u32, ShellError> {
    arg.parse()
        .map_err(|_| ShellError::InvalidPid(format!("{}: {}", command, arg)))
}

fn parse_pids(command: &str, args: &[&str], usage: &'static str) -> Result<Vec<u32>, ShellError> {
    if args.is_empty() {
        return Err(ShellError::Usage(usage));
    }
    args.iter().map(|arg| parse_pid(command, arg)).collect()
}

fn help() -> Vec<TerminalLine> {
    [
        "Available commands:",
        "  ps [n]                      list the n busiest processes",
        "  top                         system summary and top processes",
        "  kill <pid>...               terminate processes",
        "  renice <pid> <priority>     low | normal | high | realtime",
        "  stop <pid> / cont <pid>     suspend or resume a process",
        "  systemctl <verb> <unit>     status | start | stop | toggle",
        "  stress [mode]               none | cpu | memory | network",
        "  stats  df  netstat  uptime  whoami  clear",
    ]
    .into_iter()
    .map(TerminalLine::output)
    .collect()
}

fn ps(sim: &Simulation, rows: usize) -> Vec<TerminalLine> {
    let mut lines = vec![TerminalLine::new(
        LineKind::Info,
        format!(
            "{:>6} {} {:>5} {:>10} {} {}",
            "PID",
            format::fit("USER", 13),
            "%CPU",
            "MEM",
            format::fit("STATE", 9),
            "COMMAND"
        ),
    )];
    for p in sim.top_processes(rows) {
        lines.push(TerminalLine::output(format!(
            "{:>6} {} {:>5.1} {:>10} {} {}",
            p.pid,
            format::fit(&p.user, 13),
            p.cpu_usage,
            format::megabytes(p.memory_usage),
            format::fit(&p.state.to_string(), 9),
            p.name
        )));
    }
    lines
}

fn top(sim: &Simulation) -> Vec<TerminalLine> {
    let mut lines = vec![TerminalLine::output(uptime(sim))];
    let stats = &sim.world().stats;
    let stopped = sim
        .world()
        .processes
        .iter()
        .filter(|p| p.state == ProcessState::Stopped)
        .count();
    let zombie = sim
        .world()
        .processes
        .iter()
        .filter(|p| p.state == ProcessState::Zombie)
        .count();
    lines.push(TerminalLine::output(format!(
        "Tasks: {} total, {} running, {} sleeping, {} stopped, {} zombie",
        stats.total_processes, stats.running_processes, stats.sleeping_processes, stopped, zombie
    )));
    lines.push(TerminalLine::output(format!(
        "CPU: {:.1}%   Mem: {} / {} ({:.1}%)   Threads: {}",
        stats.total_cpu_usage,
        format::megabytes(stats.total_memory_usage),
        format::megabytes(stats.total_memory_available),
        stats.memory_percent(),
        stats.active_threads
    )));
    lines.extend(ps(sim, 5));
    lines
}

fn uptime(sim: &Simulation) -> String {
    let stats = &sim.world().stats;
    format!(
        "{} up {}, 1 user, load average: {:.2}, {:.2}, {:.2}",
        stats.timestamp.format("%H:%M:%S"),
        format::uptime(stats.uptime),
        stats.load_average[0],
        stats.load_average[1],
        stats.load_average[2]
    )
}

fn stats(sim: &Simulation) -> Vec<TerminalLine> {
    let stats = &sim.world().stats;
    vec![
        TerminalLine::output(format!("CPU usage:     {:.1}%", stats.total_cpu_usage)),
        TerminalLine::output(format!(
            "Memory:        {:.1}% ({})",
            stats.memory_percent(),
            format::megabytes(stats.total_memory_usage)
        )),
        TerminalLine::output(format!(
            "Disk:          {:.1}% of {:.0} GB",
            stats.disk_percent(),
            stats.disk.total_space
        )),
        TerminalLine::output(format!(
            "Network:       down {}  up {}",
            format::throughput(stats.network.download_speed),
            format::throughput(stats.network.upload_speed)
        )),
        TerminalLine::output(format!(
            "Thermal:       CPU {:.1}°C  GPU {:.1}°C  fan {:.0} RPM",
            stats.thermal.cpu_temp, stats.thermal.gpu_temp, stats.thermal.fan_speed
        )),
        TerminalLine::output(format!(
            "Battery:       {:.0}%{}",
            stats.battery.level,
            if stats.battery.is_charging {
                " (charging)"
            } else {
                ""
            }
        )),
        TerminalLine::new(
            LineKind::Info,
            format!("Health score:  {}/100", stats.health_score),
        ),
    ]
}

fn df(sim: &Simulation) -> Vec<TerminalLine> {
    let world = sim.world();
    let disk = &world.stats.disk;
    let mut lines = vec![
        TerminalLine::new(
            LineKind::Info,
            format!("{} {:>10} {:>10} {:>6}", format::fit("Filesystem", 16), "Size", "Used", "Use%"),
        ),
        TerminalLine::output(format!(
            "{} {:>10} {:>10} {:>5.0}%",
            format::fit("/dev/disk1s1", 16),
            format!("{:.0}G", disk.total_space),
            format!("{:.1}G", disk.used_space),
            world.stats.disk_percent()
        )),
    ];
    for node in &world.disk_nodes {
        lines.push(TerminalLine::output(format!(
            "{} {:>10} {:>10} {:>5.1}%",
            format::fit(&node.name, 16),
            "",
            format::megabytes(node.size),
            node.percentage
        )));
    }
    lines
}

fn netstat(sim: &Simulation) -> Vec<TerminalLine> {
    let mut lines = vec![TerminalLine::new(
        LineKind::Info,
        format!(
            "Proto {} {} {} PID/Program",
            format::fit("Local Address", 22),
            format::fit("Foreign Address", 22),
            format::fit("State", 12)
        ),
    )];
    for c in sim.connections().iter().take(NETSTAT_ROWS) {
        lines.push(TerminalLine::output(format!(
            "{} {} {} {} {}/{}",
            format::fit(&c.protocol.to_string(), 5),
            format::fit(&c.local_address, 22),
            format::fit(&c.remote_address, 22),
            format::fit(&c.state.to_string(), 12),
            c.pid,
            c.process_name
        )));
    }
    let hidden = sim.connections().len().saturating_sub(NETSTAT_ROWS);
    if hidden > 0 {
        lines.push(TerminalLine::new(
            LineKind::Info,
            format!("... {} more connections", hidden),
        ));
    }
    lines
}

fn systemctl(args: &[&str], sim: &mut Simulation) -> Result<Vec<TerminalLine>, ShellError> {
    const USAGE: &str = "systemctl <status|start|stop|toggle> <unit>";
    let [verb, unit] = args else {
        return Err(ShellError::Usage(USAGE));
    };
    let unit = resolve_unit(sim, unit)?;

    let command = match *verb {
        "status" => return Ok(service_status(sim, &unit)),
        "start" => Command::StartService(unit),
        "stop" => Command::StopService(unit),
        "toggle" | "restart" => Command::ToggleService(unit),
        _ => return Err(ShellError::Usage(USAGE)),
    };
    Ok(vec![command_line(sim.apply(command))])
}

/// Accept unit names with or without the `.service` suffix.
fn resolve_unit(sim: &Simulation, unit: &str) -> Result<String, ShellError> {
    let world = sim.world();
    if world.service(unit).is_some() {
        return Ok(unit.to_string());
    }
    let suffixed = format!("{}.service", unit);
    if world.service(&suffixed).is_some() {
        return Ok(suffixed);
    }
    Err(SimError::ServiceNotFound(unit.to_string()).into())
}

fn service_status(sim: &Simulation, unit: &str) -> Vec<TerminalLine> {
    let Some(service) = sim.world().service(unit) else {
        return vec![TerminalLine::new(
            LineKind::Error,
            SimError::ServiceNotFound(unit.to_string()).to_string(),
        )];
    };
    let kind = if service.is_active() {
        LineKind::Success
    } else {
        LineKind::Error
    };
    let mut lines = vec![
        TerminalLine::output(format!("● {} - {}", service.name, service.description)),
        TerminalLine::new(
            kind,
            format!(
                "   Active: {} ({}) for {}",
                service.status,
                service.sub_state,
                format::uptime(service.uptime)
            ),
        ),
    ];
    if let Some(pid) = service.pid {
        lines.push(TerminalLine::output(format!("   Main PID: {}", pid)));
    }
    lines
}
