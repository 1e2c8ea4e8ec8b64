//! Static reference data for the simulated machine.
//!
//! Everything the engine can spawn or seed is described here. Lookups are
//! pure and never fail: names outside the explicit preset table resolve to a
//! class default so the catalog stays exhaustive.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::sim::model::Priority;

/// Physical memory of the simulated machine.
pub const TOTAL_MEMORY_MB: f64 = 32768.0;
/// Hard ceiling on the process table.
pub const MAX_PROCESSES: usize = 80;
/// Population the engine steers towards with spawns.
pub const TARGET_PROCESSES: usize = 32;
/// Capacity of the single simulated volume.
pub const DISK_SIZE_GB: f64 = 1024.0;
/// Used space on the volume at boot.
pub const INITIAL_USED_DISK_GB: f64 = 400.0;
/// Per-process CPU is a share of one core; the aggregate is divided by this.
pub const LOGICAL_CORES: f64 = 8.0;
/// Default tick period.
pub const TICK_MS: u64 = 1500;
/// Shortest tick period accepted from configuration.
pub const MIN_TICK_MS: u64 = 50;

pub const SYSTEM_PROCESS_NAMES: &[&str] = &[
    "kernel_task",
    "launchd",
    "syslogd",
    "UserEventAgent",
    "kextd",
    "systemstats",
    "configd",
    "powerd",
    "logd",
    "distnoted",
];

pub const USER_PROCESS_NAMES: &[&str] = &[
    "chrome",
    "slack",
    "code",
    "node",
    "spotify",
    "docker",
    "postgres",
    "python",
    "java",
    "terminal",
    "zoom",
    "finder",
    "electron",
    "windowserver",
    "mds_stores",
    "teams",
    "music",
    "notion",
];

/// User processes that open sockets.
pub const NETWORKING_NAMES: &[&str] = &[
    "chrome", "slack", "code", "node", "spotify", "docker", "postgres", "python", "java", "zoom",
    "electron", "teams", "music", "notion",
];

/// Behavioral baseline for a process name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessPreset {
    pub base_cpu: f64,
    pub base_mem: f64,
    pub priority: Priority,
    pub is_system: bool,
    pub base_threads: u32,
}

impl ProcessPreset {
    const fn new(
        base_cpu: f64,
        base_mem: f64,
        priority: Priority,
        is_system: bool,
        base_threads: u32,
    ) -> Self {
        Self {
            base_cpu,
            base_mem,
            priority,
            is_system,
            base_threads,
        }
    }
}

const SYSTEM_DEFAULT: ProcessPreset = ProcessPreset::new(1.0, 60.0, Priority::High, true, 4);
const USER_DEFAULT: ProcessPreset = ProcessPreset::new(2.0, 250.0, Priority::Normal, false, 8);

static PRESETS: Lazy<IndexMap<&'static str, ProcessPreset>> = Lazy::new(|| {
    IndexMap::from([
        (
            "kernel_task",
            ProcessPreset::new(5.0, 800.0, Priority::RealTime, true, 140),
        ),
        (
            "windowserver",
            ProcessPreset::new(15.0, 1200.0, Priority::High, true, 45),
        ),
        (
            "chrome",
            ProcessPreset::new(25.0, 2500.0, Priority::Normal, false, 60),
        ),
        (
            "docker",
            ProcessPreset::new(10.0, 4000.0, Priority::Normal, false, 120),
        ),
        (
            "code",
            ProcessPreset::new(5.0, 1500.0, Priority::Normal, false, 30),
        ),
        (
            "slack",
            ProcessPreset::new(3.0, 800.0, Priority::Low, false, 15),
        ),
        (
            "node",
            ProcessPreset::new(30.0, 600.0, Priority::High, false, 12),
        ),
        (
            "java",
            ProcessPreset::new(15.0, 3000.0, Priority::Normal, false, 45),
        ),
        (
            "postgres",
            ProcessPreset::new(8.0, 1200.0, Priority::High, false, 25),
        ),
    ])
});

/// Resolve the baseline for any process name.
pub fn preset(name: &str) -> ProcessPreset {
    if let Some(preset) = PRESETS.get(name) {
        return *preset;
    }
    if SYSTEM_PROCESS_NAMES.contains(&name) {
        SYSTEM_DEFAULT
    } else {
        USER_DEFAULT
    }
}

/// Whether a name belongs to the protected set (cannot be killed).
pub fn is_protected(name: &str) -> bool {
    preset(name).is_system
}

/// Every name the engine knows about, system names first.
pub fn all_process_names() -> impl Iterator<Item = &'static str> {
    SYSTEM_PROCESS_NAMES
        .iter()
        .chain(USER_PROCESS_NAMES.iter())
        .copied()
}

/// How many instances of a name may coexist.
pub fn instance_cap(name: &str) -> usize {
    if is_protected(name) {
        1
    } else {
        4
    }
}

pub fn is_networking(name: &str) -> bool {
    NETWORKING_NAMES.contains(&name)
}

/// Owning user shown in the process table.
pub fn user_for(name: &str) -> &'static str {
    match name {
        "windowserver" => "_windowserver",
        "postgres" => "postgres",
        "mds_stores" => "_spotlight",
        _ if is_protected(name) => "root",
        _ => "admin",
    }
}

/// Launch command line for a process name.
pub fn command_for(name: &str) -> String {
    match name {
        "kernel_task" => "kernel_task".to_string(),
        "launchd" => "/sbin/launchd".to_string(),
        "windowserver" => {
            "/System/Library/PrivateFrameworks/SkyLight.framework/Resources/WindowServer -daemon"
                .to_string()
        }
        "postgres" => "/usr/local/bin/postgres -D /usr/local/var/postgres".to_string(),
        "docker" => "/usr/local/bin/dockerd --host=unix:///var/run/docker.sock".to_string(),
        "node" => "/usr/local/bin/node server.js".to_string(),
        "python" => "/usr/bin/python3 -m http.server".to_string(),
        "java" => "/usr/bin/java -Xmx4g -jar app.jar".to_string(),
        _ if SYSTEM_PROCESS_NAMES.contains(&name) => format!("/usr/libexec/{}", name),
        _ => format!("/Applications/{0}.app/Contents/MacOS/{0}", name),
    }
}

/// Well-known listening port, if the process is a server.
pub fn listen_port(name: &str) -> Option<u16> {
    match name {
        "postgres" => Some(5432),
        "node" => Some(3000),
        "docker" => Some(2375),
        "python" => Some(8000),
        "java" => Some(8080),
        _ => None,
    }
}

/// A static service definition.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDefinition {
    pub name: &'static str,
    pub description: &'static str,
}

pub const SERVICE_DEFINITIONS: &[ServiceDefinition] = &[
    ServiceDefinition {
        name: "docker.service",
        description: "Docker Application Container Engine",
    },
    ServiceDefinition {
        name: "postgresql.service",
        description: "PostgreSQL RDBMS",
    },
    ServiceDefinition {
        name: "nginx.service",
        description: "A high performance web server",
    },
    ServiceDefinition {
        name: "ssh.service",
        description: "OpenBSD Secure Shell server",
    },
    ServiceDefinition {
        name: "cron.service",
        description: "Regular background program processing daemon",
    },
    ServiceDefinition {
        name: "bluetooth.service",
        description: "Bluetooth service",
    },
    ServiceDefinition {
        name: "networking.service",
        description: "Raise network interfaces",
    },
    ServiceDefinition {
        name: "ufw.service",
        description: "Uncomplicated firewall",
    },
    ServiceDefinition {
        name: "rsyslog.service",
        description: "System Logging Service",
    },
    ServiceDefinition {
        name: "accounts-daemon.service",
        description: "Accounts Service",
    },
];

/// A directory template used to seed the disk view.
#[derive(Debug, Clone, Copy)]
pub struct DiskDirectory {
    pub name: &'static str,
    pub base_size: f64,
    pub color: &'static str,
    /// Upper bound of growth per second, in MB.
    pub growth_per_sec: f64,
}

pub const DISK_DIRECTORIES: &[DiskDirectory] = &[
    DiskDirectory {
        name: "/usr/lib",
        base_size: 4500.0,
        color: "#6366f1",
        growth_per_sec: 0.0,
    },
    DiskDirectory {
        name: "/var/log",
        base_size: 1200.0,
        color: "#ec4899",
        growth_per_sec: 0.4,
    },
    DiskDirectory {
        name: "/home/user",
        base_size: 15000.0,
        color: "#10b981",
        growth_per_sec: 0.2,
    },
    DiskDirectory {
        name: "/opt/docker",
        base_size: 8000.0,
        color: "#3b82f6",
        growth_per_sec: 0.3,
    },
    DiskDirectory {
        name: "/System",
        base_size: 12000.0,
        color: "#f59e0b",
        growth_per_sec: 0.0,
    },
    DiskDirectory {
        name: "/tmp",
        base_size: 500.0,
        color: "#64748b",
        growth_per_sec: 0.5,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_spawnable_name_has_a_preset() {
        for name in all_process_names() {
            let preset = preset(name);
            assert!(preset.base_cpu >= 0.0, "{} has negative cpu", name);
            assert!(preset.base_mem > 0.0, "{} has no memory", name);
            assert!(preset.base_threads > 0, "{} has no threads", name);
        }
    }

    #[test]
    fn system_names_are_protected() {
        for name in SYSTEM_PROCESS_NAMES {
            assert!(is_protected(name), "{} should be protected", name);
        }
        assert!(is_protected("windowserver"));
        assert!(!is_protected("chrome"));
        assert_eq!(instance_cap("kernel_task"), 1);
        assert_eq!(instance_cap("node"), 4);
    }

    #[test]
    fn explicit_presets_win_over_defaults() {
        let chrome = preset("chrome");
        assert_eq!(chrome.base_mem, 2500.0);
        assert_eq!(chrome.priority, Priority::Normal);

        let unknown = preset("spotify");
        assert_eq!(unknown, USER_DEFAULT);
    }

    #[test]
    fn catalog_fits_the_process_table() {
        assert!(all_process_names().count() <= MAX_PROCESSES);
        assert!(TARGET_PROCESSES <= MAX_PROCESSES);
        let base_disk_mb: f64 = DISK_DIRECTORIES.iter().map(|d| d.base_size).sum();
        assert!(base_disk_mb <= INITIAL_USED_DISK_GB * 1024.0);
    }
}
