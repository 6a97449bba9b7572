use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "blast-maze"])
        .status()
        .expect("cargo is available to the test harness");

    assert!(status.success(), "the blast-maze binary type-checks");
}

#[test]
fn maze_subcommand_prints_the_generated_grid() {
    let output = Command::new(env!("CARGO_BIN_EXE_blast-maze"))
        .args(["maze", "--seed", "42"])
        .output()
        .expect("blast-maze binary runs");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    let lines: Vec<&str> = stdout.lines().collect();
    let (summary, grid) = lines.split_last().expect("output is not empty");
    assert!(summary.starts_with("seed 42 after "));
    assert!(grid.len() >= 7);
    assert!(grid[0].chars().all(|symbol| symbol == '#'));
    assert!(grid.iter().all(|line| line.len() == grid[0].len()));
    assert!(grid.iter().any(|line| line.contains('S')));
}

#[test]
fn decode_rejects_foreign_strings() {
    let output = Command::new(env!("CARGO_BIN_EXE_blast-maze"))
        .args(["decode", "not-a-snapshot"])
        .output()
        .expect("blast-maze binary runs");
    assert!(!output.status.success());
}
