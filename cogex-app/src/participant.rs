use std::collections::VecDeque;

use cogex_core::{Expected, Response, TrialSpec};
use rand::Rng;

/// Scripted stand-in for a person at the keyboard.
///
/// Answers each stimulus after a uniform reaction time, gets it right with
/// probability `accuracy`, and otherwise lapses or presses the wrong key.
#[derive(Debug, Clone)]
pub struct SimulatedParticipant<R: Rng> {
    pub accuracy: f64,
    pub min_rt_ms: u64,
    pub max_rt_ms: u64,
    rng: R,
    pending: VecDeque<(Response, u64)>,
    answer: Option<Response>,
}

impl<R: Rng> SimulatedParticipant<R> {
    pub fn new(rng: R) -> Self {
        Self {
            accuracy: 0.9,
            min_rt_ms: 250,
            max_rt_ms: 700,
            rng,
            pending: VecDeque::new(),
            answer: None,
        }
    }

    fn reaction_time(&mut self) -> u64 {
        self.rng.random_range(self.min_rt_ms..=self.max_rt_ms)
    }

    /// Plans the response to a stimulus that appeared at `onset_ms`.
    pub fn on_stimulus<S>(&mut self, spec: &TrialSpec<S>, onset_ms: u64) {
        self.pending.clear();
        self.answer = match &spec.expected {
            Expected::Respond(response) => Some(response.clone()),
            Expected::Withhold => None,
        };
        let at = onset_ms + self.reaction_time();
        let correct = self.rng.random_bool(self.accuracy.clamp(0.0, 1.0));
        let planned = match (&spec.expected, correct) {
            (Expected::Respond(response), true) => Some(response.clone()),
            (Expected::Respond(response), false) => wrong_key(response),
            (Expected::Withhold, true) => None,
            (Expected::Withhold, false) => Some(Response::Space),
        };
        if let Some(response) = planned {
            self.pending.push_back((response, at));
        }
    }

    /// A wrong answer that was not accepted; try again with the right one.
    pub fn on_rejected(&mut self, now_ms: u64) {
        if let Some(answer) = self.answer.clone() {
            let at = now_ms + self.reaction_time();
            self.pending.push_back((answer, at));
        }
    }

    /// Anything still planned was meant for a trial that is over.
    pub fn on_trial_end(&mut self) {
        self.pending.clear();
        self.answer = None;
    }

    pub fn next_at(&self) -> Option<u64> {
        self.pending.front().map(|(_, at)| *at)
    }

    pub fn take(&mut self) -> Option<(Response, u64)> {
        self.pending.pop_front()
    }
}

/// The key a confused participant would press instead. `None` is a lapse.
fn wrong_key(expected: &Response) -> Option<Response> {
    match expected {
        Response::Space => None,
        Response::Left => Some(Response::Right),
        Response::Right => Some(Response::Left),
        Response::Label(label) => Some(Response::label(format!("not {label}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn perfect_participant_answers_inside_the_rt_range() {
        let mut participant = SimulatedParticipant::new(StdRng::seed_from_u64(3));
        participant.accuracy = 1.0;
        participant.on_stimulus(&TrialSpec::respond("go", (), Response::Left), 1_000);
        let (response, at) = participant.take().unwrap();
        assert_eq!(response, Response::Left);
        assert!((1_250..=1_700).contains(&at));

        participant.on_stimulus(&TrialSpec::withhold("nogo", ()), 5_000);
        assert_eq!(participant.next_at(), None);
    }

    #[test]
    fn wrong_labels_are_followed_by_the_right_one() {
        let mut participant = SimulatedParticipant::new(StdRng::seed_from_u64(4));
        participant.accuracy = 0.0;
        participant.on_stimulus(&TrialSpec::respond("numbers", (), Response::label("7")), 0);
        let (response, at) = participant.take().unwrap();
        assert_eq!(response, Response::label("not 7"));
        participant.on_rejected(at);
        assert_eq!(participant.take().map(|(r, _)| r), Some(Response::label("7")));
    }
}
