//! End-to-end check of the generator output for subject 1: file shape,
//! onset column, and seed-determined label order.

use std::fs;

use stimrun_schedule::{generate, read_table, write_table};

#[test]
fn subject_one_table_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_table(&generate(1), dir.path()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "stimuli,onsets");

    let mut labels = Vec::new();
    for (row, expected_onset) in lines[1..].iter().zip(["4.0", "8.0", "10.0"]) {
        let (label, onset) = row.rsplit_once(',').unwrap();
        assert_eq!(onset, expected_onset);
        labels.push(label);
    }

    let mut sorted = labels.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, ["Ari", "Kirsten", "Sam"]);

    // the order is a pure function of the seed
    let again = write_table(&generate(1), dir.path()).unwrap();
    assert_eq!(fs::read(&path).unwrap(), fs::read(&again).unwrap());

    // and the runner-side loader agrees with the writer
    let loaded = read_table(1, dir.path()).unwrap();
    let loaded_labels: Vec<&str> = loaded.labels().collect();
    assert_eq!(loaded_labels, labels);
}
