#![allow(clippy::float_cmp)]

use highs_session::{
    ColumnType, MatrixOrientation, ModelDescriptor, ModelStatus, ObjectiveSense, OptionValue,
    PartialSolution, Session, SessionConfig, SessionError, SparseMatrix,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn quiet_session() -> Session {
    init_tracing();
    let session = Session::new().expect("failed to create session");
    session
        .set_option("output_flag", false)
        .expect("failed to silence engine");
    session
}

/// min x + y  s.t. x + y >= 1,  x, y >= 0
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
fn test_two_by_one_lp_is_optimal() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).expect("pass model");
    session.run().expect("submit run").wait().expect("run");

    assert_eq!(session.get_model_status().unwrap(), 7);
    assert_eq!(session.model_status().unwrap(), ModelStatus::Optimal);

    let solution = session.get_solution().unwrap();
    assert!(solution.is_value_valid);
    assert!(solution.is_dual_valid);
    assert_eq!(solution.column_values.len(), 2);
    assert_eq!(solution.row_values.len(), 1);
    let sum: f64 = solution.column_values.iter().sum();
    assert!(sum >= 1.0 - 1e-9, "column sum {sum} violates the row");
    assert!((session.objective_value().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_added_row_is_respected() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();
    let block = SparseMatrix::row_wise(vec![0, 1], vec![0], vec![1.0]);
    session.add_rows(1, &[5.0], &[5.0], &block).unwrap();
    assert_eq!(session.num_rows().unwrap(), 2);

    session.solve().expect("solve");
    let solution = session.get_solution().unwrap();
    assert!((solution.column_values[0] - 5.0).abs() < 1e-9);
    assert!(solution.column_values[1].abs() < 1e-9);
    assert!((solution.row_values[1] - 5.0).abs() < 1e-9);
}

#[test]
fn test_fresh_solution_is_invalid_and_zero_filled() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();

    let solution = session.get_solution().unwrap();
    assert!(!solution.is_value_valid);
    assert!(!solution.is_dual_valid);
    assert_eq!(solution.column_values, vec![0.0, 0.0]);
    assert_eq!(solution.column_dual_values, vec![0.0, 0.0]);
    assert_eq!(solution.row_values, vec![0.0]);
    assert_eq!(solution.row_dual_values, vec![0.0]);
    assert_eq!(solution.get_primal(0), None);
}

#[test]
fn test_clear_resets_status_and_solution() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();
    session.solve().unwrap();
    assert!(session.get_solution().unwrap().is_value_valid);

    session.clear().unwrap();
    assert_eq!(session.model_status().unwrap(), ModelStatus::NotSet);
    let solution = session.get_solution().unwrap();
    assert!(!solution.is_value_valid);
    assert!(!solution.is_dual_valid);
    assert_eq!(session.num_columns().unwrap(), 0);
}

#[test]
fn test_clear_solver_keeps_model() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();
    session.solve().unwrap();
    session.clear_solver().unwrap();
    assert_eq!(session.num_columns().unwrap(), 2);
    assert!(!session.get_solution().unwrap().is_value_valid);

    session.clear_model().unwrap();
    assert_eq!(session.num_columns().unwrap(), 0);
}

#[test]
fn test_option_round_trip() {
    let session = quiet_session();

    session.set_option("log_to_console", false).unwrap();
    assert_eq!(
        session.get_option("log_to_console").unwrap(),
        OptionValue::Bool(false)
    );

    session.set_option("random_seed", 7).unwrap();
    assert_eq!(session.get_option("random_seed").unwrap(), OptionValue::Int(7));

    session.set_option("time_limit", 12.5).unwrap();
    assert_eq!(
        session.get_option("time_limit").unwrap(),
        OptionValue::Double(12.5)
    );

    session.set_option("presolve", "off").unwrap();
    assert_eq!(
        session.get_option("presolve").unwrap(),
        OptionValue::Str("off".to_string())
    );
}

#[test]
fn test_malformed_matrix_is_rejected_before_engine() {
    let session = quiet_session();
    let bad_offsets = ModelDescriptor::new(
        2,
        1,
        SparseMatrix::row_wise(vec![0, 2, 2], vec![0, 1], vec![1.0, 1.0]),
    );
    let err = session.pass_model(&bad_offsets).unwrap_err();
    assert_eq!(err.code(), "BUFFER_INVALID");

    let bad_index = ModelDescriptor::new(
        2,
        1,
        SparseMatrix::row_wise(vec![0, 2], vec![0, 2], vec![1.0, 1.0]),
    );
    assert_eq!(session.pass_model(&bad_index).unwrap_err().code(), "BUFFER_INVALID");

    let short_values = ModelDescriptor::new(
        2,
        1,
        SparseMatrix::row_wise(vec![0, 2], vec![0, 1], vec![1.0]),
    );
    assert_eq!(session.pass_model(&short_values).unwrap_err().code(), "BUFFER_INVALID");

    assert_eq!(session.num_columns().unwrap(), 0);
    assert_eq!(session.model_status().unwrap(), ModelStatus::NotSet);
}

#[test]
fn test_column_wise_model() {
    let session = quiet_session();
    let model = ModelDescriptor::new(
        2,
        1,
        SparseMatrix::column_wise(vec![0, 1, 2], vec![0, 0], vec![1.0, 1.0]),
    )
    .with_linear_weights(vec![2.0, 3.0])
    .with_column_bounds(vec![0.0, 0.0], vec![f64::INFINITY, f64::INFINITY])
    .with_row_bounds(vec![5.0], vec![f64::INFINITY]);
    session.pass_model(&model).unwrap();
    session.solve().unwrap();
    assert!((session.objective_value().unwrap() - 10.0).abs() < 1e-6);
}

#[test]
fn test_quadratic_objective() {
    let session = quiet_session();
    // min x^2 + y^2  s.t. x + y >= 1
    let weights = SparseMatrix::row_wise(vec![0, 1, 2], vec![0, 1], vec![1.0, 1.0]);
    let hessian = SparseMatrix::hessian_from_quadratic_weights(&weights, 2).unwrap();
    let model = two_by_one()
        .with_linear_weights(vec![0.0, 0.0])
        .with_hessian(hessian);
    session.pass_model(&model).unwrap();
    session.solve().unwrap();

    let solution = session.get_solution().unwrap();
    assert!((solution.column_values[0] - 0.5).abs() < 1e-5);
    assert!((solution.column_values[1] - 0.5).abs() < 1e-5);
    assert!((session.objective_value().unwrap() - 0.5).abs() < 1e-5);
}

#[test]
fn test_integer_model_and_assessment() {
    let session = quiet_session();
    // max x + y  s.t. x + y <= 2.5,  x, y in [0, 10] integer
    let model = ModelDescriptor::new(
        2,
        1,
        SparseMatrix::from_triplets(MatrixOrientation::RowWise, 1, 2, &[(0, 0, 1.0), (0, 1, 1.0)])
            .unwrap(),
    )
    .with_sense(ObjectiveSense::Maximize)
    .with_linear_weights(vec![1.0, 1.0])
    .with_column_bounds(vec![0.0, 0.0], vec![10.0, 10.0])
    .with_row_bounds(vec![f64::NEG_INFINITY], vec![2.5])
    .with_integrality(vec![ColumnType::Integer, ColumnType::Integer]);
    session.pass_model(&model).unwrap();
    session.solve().unwrap();

    assert!((session.objective_value().unwrap() - 2.0).abs() < 1e-9);
    let assessment = session.assess_primal_solution().unwrap();
    assert!(assessment.is_valid);
    assert!(assessment.is_integral);
    assert!(assessment.is_feasible);

    let info = session.get_info().unwrap();
    assert!(info.mip_node_count() >= 0);
    assert!(info.relative_gap().is_some());
    assert!((info.objective_function_value() - 2.0).abs() < 1e-9);
}

#[test]
fn test_info_after_lp_solve() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();
    session.solve().unwrap();
    let info = session.get_info().unwrap();
    assert!(info.simplex_iteration_count() >= 0);
    assert_eq!(info.primal_solution_status(), 2);
    assert!((info.objective_function_value() - 1.0).abs() < 1e-9);
    assert!(session.run_time().unwrap() >= 0.0);
}

#[test]
fn test_warm_start() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();

    let err = session.warm_start(&[1.0], None, false).unwrap_err();
    assert_eq!(err.code(), "BUFFER_INVALID");

    session.warm_start(&[0.25, 0.75], None, false).unwrap();
    let solution = session.get_solution().unwrap();
    assert!(solution.is_value_valid);
    assert_eq!(solution.column_values, vec![0.25, 0.75]);
    let assessment = session.assess_primal_solution().unwrap();
    assert!(assessment.is_feasible);

    session.solve().unwrap();
    assert!((session.objective_value().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_set_partial_solution() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();
    session
        .set_solution(&PartialSolution::primal(vec![0.0, 0.0]))
        .unwrap();
    let assessment = session.assess_primal_solution().unwrap();
    assert!(assessment.is_valid);
    assert!(!assessment.is_feasible);

    let err = session
        .set_solution(&PartialSolution::default().with_row_duals(vec![1.0, 2.0]))
        .unwrap_err();
    assert_eq!(err.code(), "BUFFER_INVALID");
}

/// One bounded column and no rows.
fn single_column() -> ModelDescriptor {
    ModelDescriptor::new(1, 0, SparseMatrix::empty(MatrixOrientation::ColumnWise, 1))
        .with_column_bounds(vec![0.0], vec![1.0])
}

/// min x + y + z  s.t. x + y + z >= 1,  x, y, z >= 0
fn three_by_one() -> ModelDescriptor {
    ModelDescriptor::new(
        3,
        1,
        SparseMatrix::row_wise(vec![0, 3], vec![0, 1, 2], vec![1.0, 1.0, 1.0]),
    )
    .with_linear_weights(vec![1.0, 1.0, 1.0])
    .with_column_bounds(vec![0.0; 3], vec![f64::INFINITY; 3])
    .with_row_bounds(vec![1.0], vec![f64::INFINITY])
}

#[test]
fn test_hint_on_model_without_rows() {
    let session = quiet_session();
    session.pass_model(&single_column()).unwrap();
    session
        .set_solution(&PartialSolution::primal(vec![0.5]))
        .unwrap();

    let solution = session.get_solution().unwrap();
    assert!(solution.is_value_valid);
    assert!(!solution.is_dual_valid);
    assert_eq!(solution.column_values, vec![0.5]);
    assert_eq!(solution.column_dual_values, vec![0.0]);
    assert!(solution.row_values.is_empty());
    assert!(solution.row_dual_values.is_empty());
}

#[test]
fn test_hint_after_model_shrinks() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();
    session.solve().unwrap();
    assert!(session.get_solution().unwrap().is_dual_valid);

    session.pass_model(&single_column()).unwrap();
    let stale = session.get_solution().unwrap();
    assert!(!stale.is_value_valid);
    assert_eq!(stale.column_values, vec![0.0]);
    assert!(stale.row_values.is_empty());

    session
        .set_solution(&PartialSolution::primal(vec![0.5]))
        .unwrap();
    let solution = session.get_solution().unwrap();
    assert!(solution.is_value_valid);
    assert!(!solution.is_dual_valid);
    assert_eq!(solution.column_values, vec![0.5]);
    assert!(solution.row_values.is_empty());
    assert!(solution.row_dual_values.is_empty());

    session.solve().unwrap();
    let solved = session.get_solution().unwrap();
    assert!(solved.is_value_valid);
    assert_eq!(solved.column_values.len(), 1);
    assert!(solved.row_values.is_empty());
}

#[test]
fn test_column_duals_alone_are_not_a_dual_hint() {
    let session = quiet_session();
    session.pass_model(&three_by_one()).unwrap();
    session.solve().unwrap();
    assert!(session.get_solution().unwrap().is_dual_valid);

    session.pass_model(&two_by_one()).unwrap();
    session
        .set_solution(&PartialSolution::primal(vec![0.0, 0.0]).with_column_duals(vec![0.0, 0.0]))
        .unwrap();
    let solution = session.get_solution().unwrap();
    assert!(solution.is_value_valid);
    assert!(!solution.is_dual_valid);
    assert_eq!(solution.column_values, vec![0.0, 0.0]);
    assert_eq!(solution.row_values, vec![0.0]);
    assert_eq!(solution.column_dual_values, vec![0.0, 0.0]);
    assert_eq!(solution.row_dual_values, vec![0.0]);
}

#[test]
fn test_row_duals_make_a_dual_hint() {
    let session = quiet_session();
    session.pass_model(&two_by_one()).unwrap();
    session
        .set_solution(&PartialSolution::primal(vec![0.25, 0.75]).with_row_duals(vec![1.0]))
        .unwrap();
    let solution = session.get_solution().unwrap();
    assert!(solution.is_value_valid);
    assert!(solution.is_dual_valid);
    assert_eq!(solution.row_dual_values, vec![1.0]);
    assert_eq!(solution.column_dual_values.len(), 2);
    assert_eq!(solution.row_values, vec![1.0]);
}

#[test]
fn test_session_from_config() {
    init_tracing();
    let config = SessionConfig::new()
        .with_time_limit(30.0)
        .with_presolve(false)
        .with_log_to_console(false)
        .with_option("output_flag", false);
    let session = Session::with_config(&config).unwrap();
    assert_eq!(
        session.get_option("presolve").unwrap(),
        OptionValue::Str("off".to_string())
    );
    assert_eq!(
        session.get_option("time_limit").unwrap(),
        OptionValue::Double(30.0)
    );

    let bad = SessionConfig::new().with_option("no_such_option", 1);
    assert!(matches!(
        Session::with_config(&bad).unwrap_err(),
        SessionError::UnknownOption { .. }
    ));
}

#[test]
fn test_version() {
    let version = highs_session::highs_version();
    assert!(version.chars().next().is_some_and(|c| c.is_ascii_digit()));
}
