use super::*;

fn sample() -> Vec<PersonaSpec> {
    vec![
        PersonaSpec { id: "aria".into(), name: "Aria".into(), voice_id: "v1".into(), personality: "warm".into() },
        PersonaSpec { id: "rex".into(), name: "Rex".into(), voice_id: "v2".into(), personality: "blunt".into() },
    ]
}

#[test]
fn selected_mode_finds_id() {
    let p = select(&sample(), "selected", Some("rex")).expect("found");
    assert_eq!(p.id, "rex");
}

#[test]
fn selected_mode_falls_back_to_first_on_unknown_id() {
    let p = select(&sample(), "selected", Some("nope")).expect("found");
    assert_eq!(p.id, "aria");
}

#[test]
fn selected_mode_falls_back_to_first_on_missing_id() {
    let p = select(&sample(), "selected", None).expect("found");
    assert_eq!(p.id, "aria");
}

#[test]
fn random_mode_returns_one_of_the_list() {
    let personas = sample();
    let p = select(&personas, "random", None).expect("found");
    assert!(personas.iter().any(|x| x.id == p.id));
}

#[test]
fn empty_list_errors() {
    assert!(select(&[], "selected", None).is_err());
}
