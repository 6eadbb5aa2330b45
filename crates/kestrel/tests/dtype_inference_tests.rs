// Datatype inference tests for softmax_bp
//
// Property tests cover the rule for every dtype combination; the scenario
// tests pin down the documented examples one by one.

use kestrel::prelude::*;
use kestrel::Error;
use proptest::prelude::*;

const FLOATS: [DType; 4] = [DType::F16, DType::BF16, DType::F32, DType::F64];
const NON_FLOATS: [DType; 4] = [DType::U8, DType::I32, DType::I64, DType::Bool];

fn any_dtype() -> impl Strategy<Value = DType> {
    prop::sample::select(DType::ALL.to_vec())
}

fn float_dtype() -> impl Strategy<Value = DType> {
    prop::sample::select(FLOATS.to_vec())
}

fn non_float_dtype() -> impl Strategy<Value = DType> {
    prop::sample::select(NON_FLOATS.to_vec())
}

fn infer(dtypes: &[DType]) -> kestrel::Result<Vec<DType>> {
    OpKind::SoftmaxBp.calculate_output_dtypes(dtypes)
}

proptest! {
    /// Equal float operands 0 and 1 always yield [operand 0], whatever operand 2 is.
    #[test]
    fn prop_output_mirrors_input(dt in float_dtype(), third in any_dtype()) {
        prop_assert_eq!(infer(&[dt, dt, third]).unwrap(), vec![dt]);
    }

    #[test]
    fn prop_wrong_arity_fails(dtypes in prop::collection::vec(any_dtype(), 0..8)
        .prop_filter("arity 3 is valid", |v| v.len() != 3))
    {
        prop_assert!(matches!(infer(&dtypes), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn prop_non_float_input_fails(bad in non_float_dtype(), grad in float_dtype(), third in any_dtype()) {
        prop_assert!(matches!(infer(&[bad, grad, third]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn prop_non_float_grad_fails(input in float_dtype(), bad in non_float_dtype(), third in any_dtype()) {
        prop_assert!(matches!(infer(&[input, bad, third]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn prop_mismatched_floats_fail(a in float_dtype(), b in float_dtype(), third in any_dtype()) {
        prop_assume!(a != b);
        prop_assert!(matches!(infer(&[a, b, third]), Err(Error::InvalidArgument(_))));
    }

    /// The config type and the descriptor agree with the OpKind rule.
    #[test]
    fn prop_all_entry_points_agree(a in any_dtype(), b in any_dtype(), c in any_dtype()) {
        let by_kind = infer(&[a, b, c]).ok();

        let x = Tensor::zeros((2,), a);
        let g = Tensor::zeros((2,), b);
        let y = Tensor::zeros((2,), c);
        let config = SoftmaxBp::new(x.clone(), g.clone(), y.clone());
        let by_config = config.calculate_output_dtypes(&[a, b, c]).ok();
        let by_desc = config.eager().calculate_output_dtypes().ok();

        prop_assert_eq!(&by_kind, &by_config);
        prop_assert_eq!(&by_kind, &by_desc);
    }
}

#[test]
fn test_scenario_all_f32() {
    assert_eq!(infer(&[DType::F32, DType::F32, DType::F32]).unwrap(), vec![DType::F32]);
}

#[test]
fn test_scenario_third_operand_unchecked() {
    // Operand 2 may differ from operands 0 and 1; the rule does not look at it.
    assert_eq!(infer(&[DType::F64, DType::F64, DType::F32]).unwrap(), vec![DType::F64]);
}

#[test]
fn test_scenario_int_input() {
    assert!(matches!(
        infer(&[DType::I32, DType::F32, DType::F32]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_scenario_mixed_precision() {
    let err = infer(&[DType::F32, DType::F64, DType::F32]).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(err.to_string().contains("[F32, F64, F32]"), "{err}");
}

#[test]
fn test_scenario_two_operands() {
    let err = infer(&[DType::F32, DType::F32]).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(err.to_string().contains("[F32, F32]"), "{err}");
}

#[test]
fn test_op_name_is_fixed() {
    assert_eq!(OpKind::SoftmaxBp.name(), "softmax_bp");
    let t = Tensor::zeros((1,), DType::F32);
    let config = SoftmaxBp::new(t.clone(), t.clone(), t);
    assert_eq!(config.op_name(), "softmax_bp");
    assert_eq!(config.eager().name(), "softmax_bp");
}
