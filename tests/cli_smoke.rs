use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn taskvault_help_works() {
    Command::cargo_bin("taskvault")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("task pipeline"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = ["init", "run", "watch", "status", "sync", "list", "advance"];

    for cmd in subcommands {
        Command::cargo_bin("taskvault")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}
