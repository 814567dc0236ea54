//! Host inspection. Shells out to the usual OS tools and turns their text into
//! typed records; nothing outside this module sees raw command output.

use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use tokio::process::Command;

use crate::export::{AdjacencyIndex, Row, RowSet, TreeEntry};

const PASSWD_PATH: &str = "/etc/passwd";
const KERNEL_THREAD_PARENT: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub uid: String,
    pub pid: u32,
    pub ppid: u32,
    pub start_time: String,
    pub tty: String,
    pub cpu_time: String,
    pub command: String,
}

impl ProcessEntry {
    pub fn tree_label(&self) -> String {
        let program = self.command.split_whitespace().next().unwrap_or("?");
        if self.tty == "?" {
            format!("{program} ({})", self.pid)
        } else {
            format!("{program} ({}) on {}", self.pid, self.tty)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemAccount {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub comment: String,
    pub home: String,
    pub shell: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total_mb: u64,
    pub used_mb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSummary {
    pub uptime: Option<String>,
    pub memory: Option<MemoryUsage>,
    pub cpu_load_percent: Option<u8>,
    pub process_count: Option<usize>,
}

/// Parses `ps -eafw` output. The header line and malformed lines are skipped.
pub fn parse_ps(output: &str) -> Vec<ProcessEntry> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let uid = fields.next()?.to_string();
            let pid = fields.next()?.parse().ok()?;
            let ppid = fields.next()?.parse().ok()?;
            let _cpu = fields.next()?;
            let start_time = fields.next()?.to_string();
            let tty = fields.next()?.to_string();
            let cpu_time = fields.next()?.to_string();
            let command = fields.collect::<Vec<_>>().join(" ");
            if command.is_empty() {
                return None;
            }
            Some(ProcessEntry {
                uid,
                pid,
                ppid,
                start_time,
                tty,
                cpu_time,
                command,
            })
        })
        .collect()
}

/// Parses `/etc/passwd` and orders accounts by uid.
pub fn parse_passwd(content: &str) -> Vec<SystemAccount> {
    let mut accounts: Vec<SystemAccount> = content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 7 {
                return None;
            }
            Some(SystemAccount {
                name: fields[0].to_string(),
                uid: fields[2].parse().ok()?,
                gid: fields[3].parse().ok()?,
                comment: fields[4].to_string(),
                home: fields[5].to_string(),
                shell: fields[6].to_string(),
            })
        })
        .collect();
    accounts.sort_by_key(|account| account.uid);
    accounts
}

/// Reads the `Mem:` line of `free -m`.
pub fn parse_free(output: &str) -> Option<MemoryUsage> {
    let line = output.lines().find(|line| line.starts_with("Mem"))?;
    let mut fields = line.split_whitespace().skip(1);
    Some(MemoryUsage {
        total_mb: fields.next()?.parse().ok()?,
        used_mb: fields.next()?.parse().ok()?,
    })
}

/// CPU load from the last sample of `vmstat 1 2`, as `100 - idle`.
pub fn parse_vmstat_load(output: &str) -> Option<u8> {
    let header = output
        .lines()
        .find(|line| line.split_whitespace().any(|field| field == "id"))?;
    let idle_column = header.split_whitespace().position(|field| field == "id")?;
    let sample = output.lines().rev().find(|line| !line.trim().is_empty())?;
    let idle: u8 = sample.split_whitespace().nth(idle_column)?.parse().ok()?;
    Some(100_u8.saturating_sub(idle))
}

pub fn process_rows(processes: &[ProcessEntry]) -> RowSet {
    processes
        .iter()
        .filter(|process| process.ppid != KERNEL_THREAD_PARENT)
        .enumerate()
        .map(|(index, process)| {
            Row::new(
                format!("processId{index}"),
                vec![
                    process.uid.clone(),
                    process.pid.to_string(),
                    process.ppid.to_string(),
                    process.command.clone(),
                    process.start_time.clone(),
                    process.tty.clone(),
                    process.cpu_time.clone(),
                ],
            )
        })
        .collect()
}

pub fn process_node_id(pid: u32) -> String {
    format!("processNodeId{pid}")
}

/// Parent/child index of the process table, keyed by tree node ids.
pub fn process_index(processes: &[ProcessEntry]) -> AdjacencyIndex {
    processes
        .iter()
        .filter(|process| process.pid != 1)
        .map(|process| {
            (
                Some(process_node_id(process.ppid)),
                TreeEntry::new(process_node_id(process.pid), process.tree_label()),
            )
        })
        .collect()
}

/// Root of the process tree: pid 1 as reported by `ps`, or a plain `init` node.
pub fn process_root(processes: &[ProcessEntry]) -> TreeEntry {
    let label = processes
        .iter()
        .find(|process| process.pid == 1)
        .map(ProcessEntry::tree_label)
        .unwrap_or_else(|| "init".to_string());
    TreeEntry::new(process_node_id(1), label)
}

pub fn account_rows(accounts: &[SystemAccount]) -> RowSet {
    accounts
        .iter()
        .enumerate()
        .map(|(index, account)| {
            Row::new(
                format!("userInfoId{index}"),
                vec![
                    account.name.clone(),
                    account.uid.to_string(),
                    account.gid.to_string(),
                    account.comment.clone(),
                    account.home.clone(),
                    account.shell.clone(),
                ],
            )
        })
        .collect()
}

pub fn summary_rows(summary: &SystemSummary) -> RowSet {
    let not_available = || "N/A".to_string();
    let specs = [
        ("Uptime", summary.uptime.clone().unwrap_or_else(not_available)),
        (
            "Total Memory",
            summary
                .memory
                .map(|m| format!("{} MB", m.total_mb))
                .unwrap_or_else(not_available),
        ),
        (
            "Used Memory",
            summary
                .memory
                .map(|m| format!("{} MB", m.used_mb))
                .unwrap_or_else(not_available),
        ),
        (
            "CPU Load",
            summary
                .cpu_load_percent
                .map(|load| format!("{load} %"))
                .unwrap_or_else(not_available),
        ),
        (
            "Processes",
            summary
                .process_count
                .map(|count| count.to_string())
                .unwrap_or_else(not_available),
        ),
    ];

    specs
        .into_iter()
        .enumerate()
        .map(|(index, (name, value))| {
            Row::new(format!("sysInfoId{index}"), vec![name.to_string(), value])
        })
        .collect()
}

/// Runs the inspection commands on the local host.
#[derive(Clone, Debug, Default)]
pub struct HostInspector;

impl HostInspector {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {program}"))?;
        if !output.status.success() {
            return Err(anyhow!("{program} exited with {}", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn processes(&self) -> Result<Vec<ProcessEntry>> {
        let output = self.run("ps", &["-eafw"]).await?;
        Ok(parse_ps(&output))
    }

    pub async fn accounts(&self) -> Result<Vec<SystemAccount>> {
        let content = tokio::fs::read_to_string(PASSWD_PATH)
            .await
            .with_context(|| format!("failed to read {PASSWD_PATH}"))?;
        Ok(parse_passwd(&content))
    }

    pub async fn summary(&self) -> SystemSummary {
        let (uptime, free, vmstat, processes) = tokio::join!(
            self.run("uptime", &[]),
            self.run("free", &["-m"]),
            self.run("vmstat", &["1", "2"]),
            self.processes(),
        );

        SystemSummary {
            uptime: first_line(uptime),
            memory: free.ok().as_deref().and_then(parse_free),
            cpu_load_percent: vmstat.ok().as_deref().and_then(parse_vmstat_load),
            process_count: processes.ok().map(|list| list.len()),
        }
    }

    pub async fn kernel(&self) -> Option<String> {
        first_line(self.run("uname", &["-a"]).await)
    }

    pub async fn hostname(&self) -> Option<String> {
        first_line(self.run("uname", &["-n"]).await)
    }

    pub async fn runlevel(&self) -> Option<String> {
        first_line(self.run("runlevel", &[]).await)
    }
}

fn first_line(output: Result<String>) -> Option<String> {
    match output {
        Ok(text) => text
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty()),
        Err(err) => {
            tracing::warn!(?err, "host inspection command failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{RootSelector, TreeExporter};

    const PS_SAMPLE: &str = "\
UID          PID    PPID  C STIME TTY          TIME CMD
root           1       0  0 Oct17 ?        00:00:03 /sbin/init splash
root           2       0  0 Oct17 ?        00:00:00 [kthreadd]
root          14       2  0 Oct17 ?        00:00:00 [rcu_sched]
root         612       1  0 Oct17 ?        00:00:00 /usr/sbin/sshd -D
teuk        4242     612  0 09:12 pts/0    00:00:00 -bash
teuk        4300    4242  0 09:13 pts/0    00:00:01 perl mediabot.pl --conf=mb.conf
";

    #[test]
    fn ps_lines_become_typed_entries() {
        let processes = parse_ps(PS_SAMPLE);
        assert_eq!(processes.len(), 6);
        assert_eq!(processes[5].command, "perl mediabot.pl --conf=mb.conf");
        assert_eq!(processes[5].ppid, 4242);
        assert_eq!(processes[4].tty, "pts/0");
    }

    #[test]
    fn process_grid_skips_kernel_threads() {
        let rows = process_rows(&parse_ps(PS_SAMPLE));
        let pids: Vec<&str> = rows.rows().iter().map(|r| r.cells[1].as_str()).collect();
        assert_eq!(pids, ["1", "2", "612", "4242", "4300"]);
        assert_eq!(rows.rows()[0].id, "processId0");
    }

    #[test]
    fn process_tree_nests_children_under_init() {
        let processes = parse_ps(PS_SAMPLE);
        let index = process_index(&processes);
        let roots = TreeExporter::new(&index)
            .build(RootSelector::Node(process_root(&processes)))
            .unwrap();
        assert_eq!(roots[0].label, "/sbin/init (1)");
        let sshd = &roots[0].children[0];
        assert_eq!(sshd.label, "/usr/sbin/sshd (612)");
        assert_eq!(sshd.children[0].label, "-bash (4242) on pts/0");
        assert_eq!(sshd.children[0].children[0].id, "processNodeId4300");
    }

    #[test]
    fn passwd_is_sorted_by_uid() {
        let content = "\
teuk:x:1000:1000:Teuk,,,:/home/teuk:/bin/bash
# comment
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
broken:line
";
        let accounts = parse_passwd(content);
        let names: Vec<_> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["root", "daemon", "teuk"]);
        let rows = account_rows(&accounts);
        assert_eq!(
            rows.rows()[2],
            Row::new(
                "userInfoId2",
                ["teuk", "1000", "1000", "Teuk,,,", "/home/teuk", "/bin/bash"]
                    .map(str::to_string)
                    .to_vec()
            )
        );
    }

    #[test]
    fn free_and_vmstat_are_read_positionally() {
        let free = "\
               total        used        free      shared  buff/cache   available
Mem:           15891        4210        7313         512        4367       10834
Swap:           2047           0        2047
";
        assert_eq!(
            parse_free(free),
            Some(MemoryUsage {
                total_mb: 15891,
                used_mb: 4210
            })
        );

        let vmstat = "\
procs -----------memory---------- ---swap-- -----io---- -system-- ------cpu-----
 r  b   swpd   free   buff  cache   si   so    bi    bo   in   cs us sy id wa st
 1  0      0 7488512 312000 4160000    0    0     5    12  120  240  3  1 95  1  0
 0  0      0 7488000 312000 4160000    0    0     0     0  310  520  7  3 88  2  0
";
        assert_eq!(parse_vmstat_load(vmstat), Some(12));
        assert_eq!(parse_vmstat_load(""), None);
    }

    #[test]
    fn summary_uses_placeholders_for_missing_values() {
        let rows = summary_rows(&SystemSummary {
            uptime: Some("10:01:02 up 3 days".to_string()),
            memory: None,
            cpu_load_percent: Some(12),
            process_count: Some(187),
        });
        let cells: Vec<_> = rows.rows().iter().map(|r| r.cells[1].as_str()).collect();
        assert_eq!(cells, ["10:01:02 up 3 days", "N/A", "N/A", "12 %", "187"]);
        assert_eq!(rows.rows()[4].id, "sysInfoId4");
    }
}
