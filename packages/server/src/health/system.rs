//! Host resource probes backed by `sysinfo`. Everything here blocks and is
//! meant to run inside `spawn_blocking`.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use sysinfo::{Disks, ProcessesToUpdate, System};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiskUsage {
    /// Mount point of the volume the measurement was taken on.
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub percent: f64,
}

/// Resource usage of this server process.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProcessUsage {
    pub pid: u32,
    pub memory_bytes: u64,
    pub cpu_percent: f32,
}

#[derive(Debug, Clone)]
pub struct HostSnapshot {
    pub cpu_percent: f32,
    pub memory: MemoryUsage,
    pub root_disk: Option<DiskUsage>,
    pub process: Option<ProcessUsage>,
}

/// Sample CPU, memory, root volume and process usage.
///
/// CPU usage is a delta between two refreshes, so this sleeps for at least
/// `cpu_sample` (and never less than sysinfo's minimum interval).
pub fn sample_host(cpu_sample: Duration) -> HostSnapshot {
    let mut sys = System::new();
    let pid = sysinfo::get_current_pid().ok();

    sys.refresh_cpu_usage();
    if let Some(pid) = pid {
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    }
    std::thread::sleep(cpu_sample.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
    sys.refresh_cpu_usage();
    sys.refresh_memory();
    if let Some(pid) = pid {
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    }

    let total = sys.total_memory();
    let available = sys.available_memory();
    let memory = MemoryUsage {
        total_bytes: total,
        available_bytes: available,
        percent: percent(total.saturating_sub(available), total),
    };

    let process = pid.and_then(|pid| {
        sys.process(pid).map(|p| ProcessUsage {
            pid: pid.as_u32(),
            memory_bytes: p.memory(),
            cpu_percent: p.cpu_usage(),
        })
    });

    HostSnapshot {
        cpu_percent: sys.global_cpu_usage(),
        memory,
        root_disk: disk_for_path(Path::new("/")),
        process,
    }
}

/// Usage of the volume holding `path`: the disk whose mount point is the
/// longest prefix of the path.
pub fn disk_for_path(path: &Path) -> Option<DiskUsage> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            DiskUsage {
                mount_point: disk.mount_point().display().to_string(),
                total_bytes: total,
                used_bytes: used,
                free_bytes: free,
                percent: percent(used, total),
            }
        })
}

/// `part / total` as a percentage rounded to one decimal.
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}
