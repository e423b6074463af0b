// End-to-end linting over source strings: index, freeze, analyze.

use civet_linter::{index_file, lint_file, LinterConfig, Report, Rule, Severity};
use civet_meta::MetadataStore;

fn lint_with_config(config: &LinterConfig, src: &str) -> Vec<Report> {
    let store = MetadataStore::new();
    let meta = index_file(&store, config, "test.php", src);
    store.update_file_meta("test.php", &meta);
    store.set_indexing_complete(true);
    lint_file(&store, config, "test.php", src)
}

fn lint(src: &str) -> Vec<Report> {
    lint_with_config(&LinterConfig::default(), src)
}

fn check_names(reports: &[Report]) -> Vec<&str> {
    reports.iter().map(|r| r.check_name.as_str()).collect()
}

#[test]
fn dead_code_after_return() {
    let reports = lint("function f(){ return 1; $x = 2; }");
    assert_eq!(check_names(&reports), vec!["deadCode"]);
}

#[test]
fn dead_code_reported_once_for_two_statements() {
    let reports = lint("function f(){ return 1; $x = 2; $y = 3; }");
    assert_eq!(check_names(&reports), vec!["deadCode"]);
}

#[test]
fn repeated_exit_is_not_dead_code() {
    let reports = lint("function f(){ return 1; return 2; }");
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn unused_variable() {
    let reports = lint("function f(int $x){ $y = $x; }");
    assert_eq!(check_names(&reports), vec!["unused"]);
    assert!(reports[0].message.contains("Unused variable y"));
}

#[test]
fn discard_variable_is_exempt() {
    let reports = lint("function f(int $x){ $_ = $x; }");
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn unused_variable_in_loop_is_not_reported() {
    let reports = lint("function f($xs){ foreach ($xs as $v) { $acc = $v; } }");
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn var_defined_in_both_branches_is_defined_after() {
    let reports = lint("function f(){ if (true) $a = 1; else $a = 2; echo $a; }");
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn var_defined_in_one_branch_is_possibly_undefined() {
    let src = "function cond(){ return true; }\nfunction f(){ if (cond()) $a = 1; echo $a; }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["undefined"]);
    assert!(reports[0].message.contains("might have not been defined"));
    assert!(reports[0].message.contains('a'));
}

#[test]
fn undefined_variable_is_an_error() {
    let reports = lint("function f(){ echo $nope; }");
    assert_eq!(check_names(&reports), vec!["undefined"]);
    assert_eq!(reports[0].level, Severity::Error);
}

#[test]
fn undefined_variable_reported_once() {
    let reports = lint("function f(){ echo $nope; echo $nope; }");
    assert_eq!(check_names(&reports), vec!["undefined"]);
}

#[test]
fn private_method_access_from_other_class() {
    let src = "class A { private function m(){} }\n\
               class B { function q(A $a){ $a->m(); } }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["accessLevel"]);
    assert!(reports[0].message.contains("private"));
}

#[test]
fn private_method_access_from_same_class() {
    let src = "class A { private function m(){} function q(){ $this->m(); } }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn protected_access_from_descendant_is_fine() {
    let src = "class Base { protected function m(){} }\n\
               class Leaf extends Base { function q(){ $this->m(); } }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn case_without_break_is_reported() {
    let src = "function f($x){ switch($x){ case 1: echo 1; case 2: echo 2; break; } }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["caseBreak"]);
}

#[test]
fn fallthrough_comment_silences_case_break() {
    let src = "function f($x){ switch($x){ case 1: echo 1;\n// fallthrough\ncase 2: echo 2; break; } }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn continue_inside_switch() {
    let src = "function f($x){ while ($x) { switch($x){ case 1: continue; } } }";
    let reports = lint(src);
    assert!(check_names(&reports).contains(&"caseContinue"), "got: {reports:?}");
}

#[test]
fn switch_all_cases_exit_without_default_does_not_kill_parent() {
    let src = "function f($x){ switch($x){ case 1: return 1; case 2: return 2; } echo 1; }";
    let reports = lint(src);
    assert!(
        !check_names(&reports).contains(&"deadCode"),
        "got: {reports:?}"
    );
}

#[test]
fn switch_all_cases_exit_with_default_kills_parent() {
    let src = "function f($x){ switch($x){ case 1: return 1; default: return 2; } echo 1; }";
    let reports = lint(src);
    assert!(check_names(&reports).contains(&"deadCode"), "got: {reports:?}");
}

#[test]
fn bare_try_is_reported() {
    let reports = lint("function f(){ try { echo 1; } }");
    assert_eq!(check_names(&reports), vec!["bareTry"]);
}

#[test]
fn try_vars_not_definite_unless_catches_exit() {
    // catch falls through, so $a may be unset after the construct.
    let src = "function f(){ try { $a = 1; } catch (Exception $e) { } echo $a; }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["undefined"]);
    assert!(reports[0].message.contains("might have not been defined"));
}

#[test]
fn try_vars_definite_when_all_catches_exit() {
    let src = "function f(){ try { $a = 1; } catch (Exception $e) { return 0; } echo $a; }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn undefined_function_call() {
    let reports = lint("function f(){ missing(); }");
    assert_eq!(check_names(&reports), vec!["undefined"]);
    assert!(reports[0].message.contains("undefined function"));
}

#[test]
fn arg_count_too_few() {
    let src = "function g($a, $b){ echo $a, $b; }\nfunction f(){ g(1); }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["argCount"]);
}

#[test]
fn arg_count_ok_with_defaults_and_spread() {
    let src = "function g($a, $b = 2){ echo $a, $b; }\n\
               function f($rest){ g(1); g(...$rest); }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn mt_rand_requires_zero_or_two_args() {
    let src = "function mt_rand(){ return 4; }\nfunction f(){ mt_rand(1); }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["argCount"]);
    assert!(reports[0].message.contains("mt_rand"));
}

#[test]
fn deprecated_function_call() {
    let src = "/** @deprecated use g() instead */\nfunction old(){}\nfunction f(){ old(); }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["deprecated"]);
    assert!(reports[0].message.contains("use g() instead"));
    assert!(!reports[0].is_critical());
}

#[test]
fn undefined_class_in_new() {
    let reports = lint("function f(){ return new Missing(); }");
    assert_eq!(check_names(&reports), vec!["undefined"]);
    assert!(reports[0].message.contains("Class not found"));
}

#[test]
fn constructor_arity_checked() {
    let src = "class A { function __construct($x){ echo $x; } }\nfunction f(){ return new A(); }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["argCount"]);
    assert!(reports[0].message.contains("constructor"));
}

#[test]
fn inheritance_cycle_terminates_lookup() {
    let src = "class A extends B { }\nclass B extends A { }\n\
               function f(A $a){ $a->missing(); }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["undefined"]);
}

#[test]
fn static_call_of_instance_method() {
    let src = "class A { function m(){} }\nfunction f(){ A::m(); }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["callStatic"]);
}

#[test]
fn instance_call_of_static_method() {
    let src = "class A { static function m(){} }\nfunction f(A $a){ $a->m(); }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["callStatic"]);
}

#[test]
fn old_array_syntax() {
    let reports = lint("function f(){ $a = array(1); return $a; }");
    assert_eq!(check_names(&reports), vec!["arraySyntax"]);
}

#[test]
fn duplicate_and_mixed_array_keys() {
    let reports = lint("function f(){ return ['a' => 1, 'a' => 2, 3]; }");
    let names = check_names(&reports);
    assert!(names.contains(&"dupArrayKeys"), "got: {reports:?}");
    assert!(names.contains(&"mixedArrayKeys"), "got: {reports:?}");
}

#[test]
fn bitwise_op_on_bools() {
    let src = "function f(bool $a, bool $b){ return $a & $b; }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["bitwiseOps"]);
}

#[test]
fn redundant_cast() {
    let reports = lint("function f(int $x){ return (int)$x; }");
    assert_eq!(check_names(&reports), vec!["redundantCast"]);
    assert!(!reports[0].is_critical());
}

#[test]
fn keyword_case() {
    let reports = lint("function f($xs){ FOREACH ($xs as $v) { echo $v; } }");
    assert_eq!(check_names(&reports), vec!["keywordCase"]);
    assert!(reports[0].message.contains("Use foreach instead of FOREACH"));
}

#[test]
fn undefined_constant_and_literal_case() {
    let reports = lint("function f(){ return MISSING; }");
    assert_eq!(check_names(&reports), vec!["undefined"]);
    let reports = lint("function f(){ return TRUE; }");
    assert_eq!(check_names(&reports), vec!["undefined"]);
    assert!(reports[0].message.contains("Use true instead of TRUE"));
    let reports = lint("function f(){ return true; }");
    assert!(reports.is_empty());
}

#[test]
fn compact_marks_variables_read_and_checks_them() {
    let src = "function compact($names){ return []; }\n\
               function f(){ $a = 1; return compact('a'); }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");

    let src = "function compact($names){ return []; }\n\
               function f(){ return compact('missing'); }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["undefined"]);
}

#[test]
fn closure_captures() {
    let src = "function f(){ $a = 1; $g = function () use ($a) { return $a; }; return $g; }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");

    let src = "function f(){ $g = function () use ($b) { return $b; }; return $g; }";
    let reports = lint(src);
    // The bad capture itself plus the read of the never-created $b.
    assert!(!reports.is_empty());
    assert!(check_names(&reports).iter().all(|n| *n == "undefined"));
}

#[test]
fn closure_by_ref_capture_may_be_undefined() {
    let src = "function f(){ $g = function () use (&$out) { $out = 1; }; return $g; }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn isset_narrowing_is_scoped_to_the_if() {
    let src = "function f(){ if (isset($maybe)) { echo $maybe; } echo $maybe; }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["undefined"]);
}

#[test]
fn global_and_static_vars_are_not_unused() {
    let reports = lint("function f(){ global $db; $db = 1; }");
    assert!(reports.is_empty(), "got: {reports:?}");
    let reports = lint("function f(){ static $n = 0; $n = $n + 1; }");
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn by_ref_param_writes_are_not_unused() {
    let reports = lint("function f(&$out){ $out = 1; }");
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn by_ref_call_argument_defines_the_variable() {
    let src = "function fill(&$out){ $out = 1; }\nfunction f(){ fill($x); return $x; }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn doc_var_defines_variable() {
    let src = "function g(){ return []; }\n\
               function f(){ /** @var int $n */\n $n = g(); return $n + 1; }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn malformed_doc_var_is_linted() {
    let src = "function f(){ /** @var int */\n echo 1; }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["phpdocLint"]);
}

#[test]
fn phpdoc_type_suggestions() {
    let src = "/** @param integer $x */\nfunction f($x){ echo $x; }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["phpdocType"]);
    assert!(reports[0].message.contains("Use int type instead of integer"));
}

#[test]
fn syntax_error_is_a_report_not_a_failure() {
    let reports = lint("function f(){ $a = ; }\nfunction g(){ echo $nope; }");
    let names = check_names(&reports);
    assert!(names.contains(&"syntax"), "got: {reports:?}");
    // The walk continued past the broken function.
    assert!(names.contains(&"undefined"), "got: {reports:?}");
}

#[test]
fn file_disable_marker_flags_reports() {
    let src = "/** @linter disable */\nfunction f(){ echo $nope; }";
    let reports = lint(src);
    assert!(!reports.is_empty());
    assert!(reports.iter().all(|r| r.is_disabled));
}

#[test]
fn reports_come_out_in_source_order() {
    let src = "function f(){ echo $a; echo $b; echo $c; }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["undefined", "undefined", "undefined"]);
    let chars: Vec<usize> = reports.iter().map(|r| r.start_char).collect();
    let mut sorted = chars.clone();
    sorted.sort_unstable();
    assert_eq!(chars, sorted);
}

#[test]
fn rule_pattern_matches_and_interpolates() {
    let mut config = LinterConfig::default();
    config.rules_any.add(
        Rule::new(
            "sleepLiteral",
            Severity::Warning,
            "sleeping for %n% seconds",
            "sleep(${\"n:int\"})",
        )
        .unwrap(),
    );
    let src = "function sleep($n){}\nfunction f(){ sleep(30); }";
    let reports = lint_with_config(&config, src);
    let rule_reports: Vec<_> = reports
        .iter()
        .filter(|r| r.check_name == "sleepLiteral")
        .collect();
    assert_eq!(rule_reports.len(), 1);
    assert_eq!(rule_reports[0].message, "sleeping for 30 seconds");
}

#[test]
fn statement_rule_matches_statement_nodes() {
    let mut config = LinterConfig::default();
    config.rules_any.add(
        Rule::new(
            "echoLiteral",
            Severity::Warning,
            "echoing literal %s%",
            "echo ${\"s:str\"};",
        )
        .unwrap(),
    );
    let src = "function f(){ echo 'hi'; echo $_SERVER; }";
    let reports = lint_with_config(&config, src);
    let rule_reports: Vec<_> = reports
        .iter()
        .filter(|r| r.check_name == "echoLiteral")
        .collect();
    assert_eq!(rule_reports.len(), 1);
    assert_eq!(rule_reports[0].message, "echoing literal 'hi'");
}

#[test]
fn statement_rule_matches_control_flow() {
    let mut config = LinterConfig::default();
    config.rules_any.add(
        Rule::new(
            "emptyBodyWhile",
            Severity::Warning,
            "suspicious while",
            "while (${\"c:expr\"}) {}",
        )
        .unwrap(),
    );
    let src = "function f($x){ while ($x) { $x = $x - 1; } }";
    let reports = lint_with_config(&config, src);
    assert!(
        reports.iter().any(|r| r.check_name == "emptyBodyWhile"),
        "got: {reports:?}"
    );
}

#[test]
fn method_call_through_parent_chain() {
    let src = "class Base { public function m(){} }\n\
               class Leaf extends Base { function q(){ $this->m(); } }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn undefined_property_fetch() {
    let src = "class A { }\nfunction f(A $a){ return $a->nope; }";
    let reports = lint(src);
    assert_eq!(check_names(&reports), vec!["undefined"]);
    assert!(reports[0].message.contains("does not exist"));
}

#[test]
fn magic_get_silences_undefined_property() {
    let src = "class A { function __get($name){ return 1; } }\nfunction f(A $a){ return $a->nope; }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn property_assignment_flows_into_metadata() {
    let src = "class A { private $items; function add(){ $this->items = [1]; } \
               function get(){ return $this->items; } }";
    let reports = lint(src);
    assert!(reports.is_empty(), "got: {reports:?}");
}
