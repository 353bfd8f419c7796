use std::{error::Error, fs, path::PathBuf, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn output_directory(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name)
}

#[test]
fn test_file_missing() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("psmnormer")?;

    cmd.arg("not_real.tsv").arg("-o").arg(output_directory("missing"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read input not_real.tsv"));
    Ok(())
}

#[test]
fn test_malformed_threshold() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("psmnormer")?;

    cmd.arg("not_real.tsv").args(["-S", "abc"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid float literal"));
    Ok(())
}

#[test]
fn test_malformed_modification() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("psmnormer")?;
    cmd.arg("./tests/data/msgfplus_small.tsv")
        .arg("-o")
        .arg(output_directory("malformed"))
        .args(["--config-file", "./tests/data/malformed_modification.toml"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Malformed modification definition"));
    Ok(())
}

#[test]
fn test_run_small() -> Result<(), Box<dyn Error>> {
    let out = output_directory("small");
    let mut cmd = Command::cargo_bin("psmnormer")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/msgfplus_small.tsv")
        .arg("-o")
        .arg(&out)
        .args(["--config-file", "./tests/data/modifications.toml"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Lines Read: 6"))
        .stderr(predicate::str::contains("Lines Skipped: 1"))
        .stderr(predicate::str::contains("Results Parsed: 8"))
        .stderr(predicate::str::contains("Synopsis Results: 7"))
        .stderr(predicate::str::contains("First Hits Results: 5"))
        .stderr(predicate::str::contains("Line 6:"));

    let synopsis = fs::read_to_string(out.join("msgfplus_small_syn.txt"))?;
    let mut lines = synopsis.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("ResultID\tScan\tFragMethod\tSpecIndex\tCharge"));
    assert!(header.ends_with("Rank_SpecEValue\tQValue\tPepQValue\tIsotopeError"));
    let first: Vec<&str> = lines.next().unwrap().split('\t').collect();
    assert_eq!(first[0], "1");
    assert_eq!(first[1], "1000");
    assert_eq!(first[9], "-.M#DHTPQSQLK.L");
    assert_eq!(first[11], "2");
    assert!(synopsis.contains("R.M*PEPTIDEK.-"));
    assert!(!synopsis.contains("ACDEFGHIK"));

    let first_hits = fs::read_to_string(out.join("msgfplus_small_fht.txt"))?;
    assert!(first_hits.contains("K.ACDEFGHIK.L"));
    assert!(!first_hits.contains("LVNEVTEFAK"));
    assert!(!first_hits.contains("XXX_Prot4"));

    let groups = fs::read_to_string(out.join("msgfplus_small_ScanGroupInfo.txt"))?;
    assert_eq!(groups, "Scan_Group_ID\tCharge\tScan\n1\t2\t1002\n1\t2\t1003\n");

    let summary = fs::read_to_string(out.join("msgfplus_small_ModSummary.txt"))?;
    assert!(summary.contains("#\t42.010565\t<\tT\t1"));
    assert!(summary.contains("*\t15.994915\tM\tD\t4"));
    Ok(())
}
