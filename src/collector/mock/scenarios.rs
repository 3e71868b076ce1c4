//! Pre-built mock filesystem scenarios for testing the samplers.

use super::filesystem::MockFs;

impl MockFs {
    /// Two supervised workers on a 4000 MiB machine.
    ///
    /// - pid 101 `worker` (single instance): 4 threads, ctx 1500/37,
    ///   rss 100 MiB (2.5%), 4 fds of which 2 sockets
    /// - pid 202 `worker` in group `pool`: 2 threads, ctx 300/5,
    ///   rss 50 MiB (1.25%), 2 fds of which 1 socket
    pub fn supervised_workers() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/meminfo", "MemTotal:       4096000 kB\nMemFree:        1024000 kB\nMemAvailable:   2048000 kB\n");

        fs.add_process(
            101,
            "101 (worker) S 1 101 101 0 -1 4194304 120 0 0 0 500 250 0 0 20 0 4 0 8000 123456789 25600 18446744073709551615",
            "Name:\tworker\nPid:\t101\nPPid:\t1\nvoluntary_ctxt_switches:\t1500\nnonvoluntary_ctxt_switches:\t37\n",
        );
        fs.add_link("/proc/101/fd/0", "/dev/pts/0");
        fs.add_link("/proc/101/fd/1", "socket:[100]");
        fs.add_link("/proc/101/fd/2", "pipe:[200]");
        fs.add_link("/proc/101/fd/3", "socket:[101]");

        fs.add_process(
            202,
            "202 (worker) S 1 202 202 0 -1 4194304 60 0 0 0 100 50 0 0 20 0 2 0 9000 98765432 12800 18446744073709551615",
            "Name:\tworker\nPid:\t202\nPPid:\t1\nvoluntary_ctxt_switches:\t300\nnonvoluntary_ctxt_switches:\t5\n",
        );
        fs.add_link("/proc/202/fd/0", "/dev/null");
        fs.add_link("/proc/202/fd/1", "socket:[300]");

        fs
    }
}
