//! Tests for tab-separated row streams and in-memory sources.

use dcc_ingest::{DataRow, LineNumbering, MemoryRowSource, RowSource, RowStream, TsvRowStream};
use dcc_model::FileType;

fn collect(stream: &mut dyn RowStream) -> Vec<DataRow> {
    let mut rows = Vec::new();
    while let Some(row) = stream.next_row() {
        rows.push(row.expect("read row"));
    }
    rows
}

#[test]
fn header_is_consumed_and_rows_numbered_from_one() {
    let text = "donor_id\tdonor_sex\nD1\tmale\nD2\tfemale\n";
    let mut stream =
        TsvRowStream::from_reader("donor.txt", text.as_bytes(), LineNumbering::DataRow)
            .expect("open stream");
    assert_eq!(stream.header(), &["donor_id", "donor_sex"]);
    assert_eq!(stream.file_name(), "donor.txt");

    let rows = collect(&mut stream);
    assert_eq!(
        rows,
        vec![
            DataRow {
                line: 1,
                values: vec!["D1".to_string(), "male".to_string()],
            },
            DataRow {
                line: 2,
                values: vec!["D2".to_string(), "female".to_string()],
            },
        ]
    );
}

#[test]
fn physical_numbering_counts_the_header() {
    let text = "donor_id\nD1\nD2\n";
    let mut stream =
        TsvRowStream::from_reader("donor.txt", text.as_bytes(), LineNumbering::Physical)
            .expect("open stream");
    let lines: Vec<i64> = collect(&mut stream).into_iter().map(|row| row.line).collect();
    assert_eq!(lines, vec![2, 3]);
}

#[test]
fn blank_lines_keep_their_line_numbers() {
    let text = "donor_id\tsex\nD1\tm\n\nD1\tf\n";
    let mut stream = TsvRowStream::from_reader("donor.txt", text.as_bytes(), LineNumbering::DataRow)
        .expect("open stream");
    let rows: Vec<(i64, usize)> = collect(&mut stream)
        .into_iter()
        .map(|row| (row.line, row.values.len()))
        .collect();
    assert_eq!(rows, vec![(1, 2), (2, 0), (3, 2)]);

    let mut stream =
        TsvRowStream::from_reader("donor.txt", text.as_bytes(), LineNumbering::Physical)
            .expect("open stream");
    let lines: Vec<i64> = collect(&mut stream).into_iter().map(|row| row.line).collect();
    assert_eq!(lines, vec![2, 3, 4]);
}

#[test]
fn last_row_without_newline_after_blank_lines() {
    let text = "donor_id\r\nD1\r\n\n\nD2";
    let mut stream = TsvRowStream::from_reader("donor.txt", text.as_bytes(), LineNumbering::DataRow)
        .expect("open stream");
    assert_eq!(stream.header(), &["donor_id"]);
    let rows: Vec<(i64, Vec<String>)> = collect(&mut stream)
        .into_iter()
        .map(|row| (row.line, row.values))
        .collect();
    assert_eq!(
        rows,
        vec![
            (1, vec!["D1".to_string()]),
            (2, Vec::new()),
            (3, Vec::new()),
            (4, vec!["D2".to_string()]),
        ]
    );
}

#[test]
fn ragged_rows_are_passed_through() {
    let text = "a\tb\tc\n1\t2\n1\t2\t3\t4\n";
    let mut stream = TsvRowStream::from_reader("x.txt", text.as_bytes(), LineNumbering::DataRow)
        .expect("open stream");
    let widths: Vec<usize> = collect(&mut stream)
        .into_iter()
        .map(|row| row.values.len())
        .collect();
    assert_eq!(widths, vec![2, 4]);
}

#[test]
fn quotes_are_literal() {
    let text = "name\tnote\nD1\t\"quoted\tvalue\n";
    let mut stream = TsvRowStream::from_reader("x.txt", text.as_bytes(), LineNumbering::DataRow)
        .expect("open stream");
    let rows = collect(&mut stream);
    assert_eq!(rows[0].values, vec!["D1", "\"quoted", "value"]);
}

#[test]
fn memory_source_lists_shards_in_insertion_order() {
    let donor = FileType::from_index(0);
    let specimen = FileType::from_index(1);
    let mut source = MemoryRowSource::new()
        .with_rows(donor, "donor.1.txt", [["D1"]])
        .with_rows(donor, "donor.2.txt", [["D2"], ["D3"]]);
    source
        .add_tsv(specimen, "specimen.txt", "specimen_id\tdonor_id\nS1\tD1\n")
        .expect("add tsv");

    assert_eq!(source.files(donor), vec!["donor.1.txt", "donor.2.txt"]);
    assert!(source.files(FileType::from_index(7)).is_empty());

    let mut second = source.open(donor, "donor.2.txt").expect("open shard");
    let rows = collect(second.as_mut());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].line, 2);

    let mut specimens = source.open(specimen, "specimen.txt").expect("open specimen");
    assert_eq!(collect(specimens.as_mut())[0].values, vec!["S1", "D1"]);

    assert!(source.open(donor, "donor.3.txt").is_err());
}
