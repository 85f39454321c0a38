use highs_session::{
    ModelDescriptor, OptionValue, Session, SolutionStyle, SparseMatrix, read_progress,
};
use std::fs;

fn quiet_session() -> Session {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
    let session = Session::new().expect("failed to create session");
    session.set_option("output_flag", false).unwrap();
    session
}

fn two_by_one() -> ModelDescriptor {
    ModelDescriptor::new(
        2,
        1,
        SparseMatrix::row_wise(vec![0, 2], vec![0, 1], vec![1.0, 1.0]),
    )
    .with_linear_weights(vec![1.0, 1.0])
    .with_column_bounds(vec![0.0, 0.0], vec![f64::INFINITY, f64::INFINITY])
    .with_row_bounds(vec![1.0], vec![f64::INFINITY])
}

#[test]
fn test_write_then_read_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.mps");

    let writer = quiet_session();
    writer.pass_model(&two_by_one()).unwrap();
    writer.write_model(&path).unwrap().wait().expect("write model");
    assert!(fs::metadata(&path).unwrap().len() > 0);

    let reader = quiet_session();
    reader.read_model(&path).unwrap().wait().expect("read model");
    assert_eq!(reader.num_columns().unwrap(), 2);
    assert_eq!(reader.num_rows().unwrap(), 1);
    reader.solve().unwrap();
    assert!((reader.objective_value().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_write_solution_styles() {
    let dir = tempfile::tempdir().unwrap();
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();
    session.solve().unwrap();

    let raw = dir.path().join("raw.sol");
    session
        .write_solution(&raw, SolutionStyle::Raw)
        .unwrap()
        .wait()
        .expect("write raw solution");
    let pretty = dir.path().join("pretty.sol");
    let (sender, receiver) = std::sync::mpsc::channel();
    session
        .write_solution_with(&pretty, SolutionStyle::try_from(1).unwrap(), move |result| {
            sender.send(result).unwrap();
        })
        .unwrap();
    receiver.recv().unwrap().expect("write pretty solution");

    let raw_text = fs::read_to_string(&raw).unwrap();
    let pretty_text = fs::read_to_string(&pretty).unwrap();
    assert!(!raw_text.is_empty());
    assert!(!pretty_text.is_empty());
    assert_ne!(raw_text, pretty_text);
}

#[test]
fn test_log_file_session() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("highs.log");
    let session = Session::with_log_file(&log).unwrap();
    assert_eq!(session.log_file(), Some(log.as_path()));
    assert_eq!(
        session.get_option("log_file").unwrap(),
        OptionValue::Str(log.to_str().unwrap().to_string())
    );
    assert_eq!(
        session.get_option("log_to_console").unwrap(),
        OptionValue::Bool(false)
    );

    session.pass_model(&two_by_one()).unwrap();
    session.solve().unwrap();
    assert!(fs::metadata(&log).unwrap().len() > 0);
    // An LP log has no branch-and-bound table.
    assert_eq!(read_progress(&log).unwrap(), None);
}
