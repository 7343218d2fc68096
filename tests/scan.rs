use std::io::Write;

use hdf5_udf_core::scan_dataset_references;

/// spec.md §8 scenario 6: a UDF containing `lib.getData<float>("temp");`
/// and `lib.getData<int>("rh");` inside text the preprocessor strips
/// (comments) yields `["temp", "rh"]`, in source order.
#[test]
fn scan_extracts_dataset_names_through_the_preprocessor() {
    let mut source = tempfile::Builder::new()
        .prefix("udf-scan-fixture-")
        .suffix(".cpp")
        .tempfile()
        .expect("create scan fixture");
    write!(
        source,
        r#"
// This comment mentions lib.getData("decoy") but is stripped by cpp.
auto v = lib.getData<float>("temp");
auto w = lib.getData<int>("rh");
"#
    )
    .expect("write scan fixture");

    let names = scan_dataset_references(source.path());
    assert_eq!(names, vec!["temp".to_string(), "rh".to_string()]);
}

#[test]
fn scan_returns_empty_list_for_udf_referencing_zero_datasets() {
    let mut source = tempfile::Builder::new()
        .prefix("udf-scan-empty-")
        .suffix(".cpp")
        .tempfile()
        .expect("create scan fixture");
    write!(source, "int unused = 0;\n").expect("write scan fixture");

    assert!(scan_dataset_references(source.path()).is_empty());
}
