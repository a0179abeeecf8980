//! Compile-time checks: a real entity definition derives cleanly. The
//! missing-table-name rejection is asserted in the crate's unit tests,
//! where the error does not depend on rustc's diagnostic formatting.

#[test]
fn ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/basic.rs");
}
