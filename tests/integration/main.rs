//! Integration tests for sheetpack

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Project layout shared by the tests: two images, a tree with one job,
/// and a config pointing at a private cache document
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(program: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("art/ui")).unwrap();
        std::fs::write(dir.path().join("art/ui/button.png"), b"button").unwrap();
        std::fs::write(dir.path().join("art/ui/panel.png"), b"panel").unwrap();
        std::fs::write(
            dir.path().join("art/tree.json"),
            r#"{
                "options": { "params": ["--format", "cocos2d", "--max-size", "2048"] },
                "children": [
                    {
                        "options": {
                            "input_files": [["ui", "*.png"]],
                            "output_path": ["atlas", "ui"],
                            "rotation": true
                        }
                    }
                ]
            }"#,
        )
        .unwrap();

        let config = format!(
            "[packer]\nprogram = \"{}\"\n\n[cache]\npath = \"{}\"\n",
            program,
            dir.path().join("cache.json").display()
        );
        std::fs::write(dir.path().join("config.toml"), config).unwrap();

        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn tree(&self) -> PathBuf {
        self.path().join("art/tree.json")
    }

    fn config(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    fn out(&self) -> PathBuf {
        self.path().join("out")
    }
}

#[cfg(unix)]
fn fake_packer(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-packer");
    std::fs::write(
        &path,
        r#"#!/bin/sh
sheet=""
data=""
while [ $# -gt 0 ]; do
  case "$1" in
    --sheet) sheet="$2"; shift 2 ;;
    --data) data="$2"; shift 2 ;;
    *) shift ;;
  esac
done
mkdir -p "$(dirname "$sheet")" "$(dirname "$data")"
printf 'sheet' > "$sheet"
printf 'data' > "$data"
"#,
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    pub(super) fn sheetpack() -> Command {
        cargo_bin_cmd!("sheetpack")
    }

    #[test]
    fn help_displays() {
        sheetpack()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Pack every sheet described by an option tree"));
    }

    #[test]
    fn version_displays() {
        sheetpack()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("sheetpack"));
    }

    #[test]
    fn config_path_honors_flag() {
        let fixture = Fixture::new("TexturePacker");
        sheetpack()
            .arg("--config")
            .arg(fixture.config())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let fixture = Fixture::new("TexturePacker");
        sheetpack()
            .arg("--config")
            .arg(fixture.config())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[packer]"));
    }

    #[test]
    fn plan_lists_jobs_as_json() {
        let fixture = Fixture::new("TexturePacker");
        sheetpack()
            .arg("--config")
            .arg(fixture.config())
            .args(["plan", "--format", "json", "--input"])
            .arg(fixture.tree())
            .assert()
            .success()
            .stdout(predicate::str::contains("\"sheet\": \"atlas/ui.pvr.ccz\""))
            .stdout(predicate::str::contains("--enable-rotation"))
            .stdout(predicate::str::contains("button.png"));
    }

    #[test]
    fn plan_missing_tree_fails() {
        sheetpack()
            .args(["plan", "--input", "/nonexistent/tree.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn pack_with_missing_tool_fails() {
        let fixture = Fixture::new("sheetpack-no-such-packer");
        sheetpack()
            .arg("--config")
            .arg(fixture.config())
            .args(["pack", "--no-cache", "-i"])
            .arg(fixture.tree())
            .arg("-o")
            .arg(fixture.out())
            .assert()
            .failure()
            .stderr(predicate::str::contains("1 of 1 job(s) failed"));
    }

    #[test]
    fn cache_list_empty() {
        let fixture = Fixture::new("TexturePacker");
        sheetpack()
            .arg("--config")
            .arg(fixture.config())
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{}"));
    }
}

#[cfg(unix)]
mod pack_tests {
    use super::cli_tests::sheetpack;
    use super::*;
    use predicates::prelude::*;

    #[test]
    fn local_pack_builds_then_skips() {
        let temp = TempDir::new().unwrap();
        let tool = fake_packer(temp.path());
        let fixture = Fixture::new(&tool.display().to_string());

        let pack = || {
            let mut cmd = sheetpack();
            cmd.arg("--config")
                .arg(fixture.config())
                .args(["pack", "-t", "local", "-i"])
                .arg(fixture.tree())
                .arg("-o")
                .arg(fixture.out());
            cmd
        };

        pack()
            .assert()
            .success()
            .stdout(predicate::str::contains("1 built, 0 up to date, 0 failed"));
        assert_eq!(
            std::fs::read(fixture.out().join("atlas/ui.pvr.ccz")).unwrap(),
            b"sheet"
        );
        assert!(fixture.path().join("cache.json").exists());

        pack()
            .assert()
            .success()
            .stdout(predicate::str::contains("0 built, 1 up to date, 0 failed"));

        // Touching an output invalidates the record
        std::fs::write(fixture.out().join("atlas/ui.plist"), b"edited").unwrap();
        pack()
            .assert()
            .success()
            .stdout(predicate::str::contains("1 built"));
    }

    #[test]
    fn cache_clear_forces_rebuild() {
        let temp = TempDir::new().unwrap();
        let tool = fake_packer(temp.path());
        let fixture = Fixture::new(&tool.display().to_string());

        sheetpack()
            .arg("--config")
            .arg(fixture.config())
            .args(["pack", "-i"])
            .arg(fixture.tree())
            .arg("-o")
            .arg(fixture.out())
            .assert()
            .success();

        sheetpack()
            .arg("--config")
            .arg(fixture.config())
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 record(s)"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn remote_pack_round_trip() {
        use sheetpack::processor::PackerTool;
        use sheetpack::server::ExecutionService;

        let temp = TempDir::new().unwrap();
        let tool = fake_packer(temp.path());
        let service = ExecutionService::new(
            PackerTool::new(tool.display().to_string()),
            Some(temp.path().join("scratch")),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, service.router(10 * 1024 * 1024))
                .await
                .unwrap();
        });

        // The client machine has no packer at all
        let fixture = Fixture::new("sheetpack-no-such-packer");
        let config = fixture.config();
        let tree = fixture.tree();
        let out = fixture.out();

        let output = tokio::task::spawn_blocking(move || {
            sheetpack()
                .arg("--config")
                .arg(config)
                .args(["pack", "-t", "remote", "-a", &address, "-i"])
                .arg(tree)
                .arg("-o")
                .arg(out)
                .output()
                .unwrap()
        })
        .await
        .unwrap();

        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert_eq!(
            std::fs::read(fixture.out().join("atlas/ui.plist")).unwrap(),
            b"data"
        );
        assert_eq!(
            std::fs::read_dir(temp.path().join("scratch")).unwrap().count(),
            0
        );
    }
}
