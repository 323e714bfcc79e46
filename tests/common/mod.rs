//! Shell-script stand-ins for the external tools a benchmark run needs.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A scratch workspace with a fake SP2B generator, GNU time and serdi.
#[allow(dead_code)]
pub struct Workspace {
    pub dir: TempDir,
    pub sp2b_dir: PathBuf,
    pub time_bin: PathBuf,
    pub serdi: PathBuf,
    pub tool: PathBuf,
    gen_log: PathBuf,
}

#[allow(dead_code)]
impl Workspace {
    /// `user_time` is what the fake `time -v` reports for every command.
    pub fn new(user_time: &str) -> Self {
        let dir = TempDir::new().expect("create workspace");
        let root = dir.path().to_path_buf();

        let sp2b_dir = root.join("sp2b");
        fs::create_dir(&sp2b_dir).unwrap();
        let gen_log = root.join("gen.log");
        write_script(
            &sp2b_dir.join("sp2b_gen"),
            &format!(
                "echo \"$2\" >> '{}'\necho \"<urn:s> <urn:p> \\\"$2\\\" .\" > \"$3\"\n",
                gen_log.display()
            ),
        );

        let bin = root.join("bin");
        fs::create_dir(&bin).unwrap();

        let time_bin = bin.join("time");
        write_script(
            &time_bin,
            &format!(
                "shift\n\"$@\"\nstatus=$?\n\
                 printf '\\tCommand being timed: \"%s\"\\n' \"$*\" >&2\n\
                 printf '\\tUser time (seconds): {user_time}\\n' >&2\n\
                 printf '\\tMaximum resident set size (kbytes): 2048\\n' >&2\n\
                 exit $status\n"
            ),
        );

        let serdi = bin.join("serdi");
        write_script(&serdi, "for last; do :; done\ncat \"$last\"\n");

        let tool = bin.join("rdf_tool");
        write_script(&tool, "for last; do :; done\ncat \"$last\"\n");

        Self {
            dir,
            sp2b_dir,
            time_bin,
            serdi,
            tool,
            gen_log,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root().join("build")
    }

    /// Sizes the fake generator has been asked for, in call order.
    pub fn generator_calls(&self) -> Vec<u64> {
        fs::read_to_string(&self.gen_log)
            .unwrap_or_default()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect()
    }

    pub fn read_build_file(&self, name: &str) -> String {
        fs::read_to_string(self.build_dir().join(name))
            .unwrap_or_else(|e| panic!("reading {name}: {e}"))
    }
}
