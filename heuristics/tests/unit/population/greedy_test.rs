use super::*;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Scored(f64);

impl Individual for Scored {
    fn fitness(&self) -> f64 {
        self.0
    }
}

#[test]
fn can_keep_best_solution() {
    let mut population = Greedy::<Scored>::new(1, None);

    assert!(population.add(Scored(10.)));
    assert_eq!(population.size(), 1);
    assert_eq!(population.ranked().next(), Some(&Scored(10.)));

    assert!(!population.add(Scored(5.)));
    assert_eq!(population.ranked().next(), Some(&Scored(10.)));

    assert!(population.add(Scored(20.)));
    assert_eq!(population.ranked().next(), Some(&Scored(20.)));
}

#[test]
fn can_format_empty_population() {
    let population = Greedy::<Scored>::new(1, None);

    assert_eq!(format!("{population}"), "[]");
}

#[test]
fn can_format_filled_population() {
    let population = Greedy::new(1, Some(Scored(83.5)));

    assert_eq!(format!("{population}"), "[83.5000000]");
}

#[test]
fn can_select_when_empty() {
    let population = Greedy::<Scored>::new(1, None);

    assert_eq!(population.select().count(), 0);
}

#[test]
fn can_add_all_and_report_improvement() {
    let mut population = Greedy::<Scored>::new(1, None);

    let improved = population.add_all(vec![Scored(1.), Scored(5.), Scored(3.)]);

    assert!(improved);
    assert_eq!(population.ranked().next(), Some(&Scored(5.)));
}
