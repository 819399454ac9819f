/// A step counter that hands out step indices up to a hard cap.
///
/// The session loop also stops early when the traffic simulator runs out of
/// vehicles; the clock only enforces the cap.
///
/// # Examples
///
/// ```
/// use ev_price_sim::sim::clock::StepClock;
///
/// let mut clock = StepClock::new(3);
/// let mut steps = Vec::new();
/// while let Some(step) = clock.tick() {
///     steps.push(step);
/// }
/// assert_eq!(steps, vec![0, 1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct StepClock {
    /// Next step to hand out
    current: usize,
    /// Maximum number of steps
    cap: usize,
}

impl StepClock {
    /// Creates a clock that yields at most `cap` steps.
    pub fn new(cap: usize) -> Self {
        Self { current: 0, cap }
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(step)` - The step index (starting from 0) before advancing
    /// * `None` - If the cap has been reached
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.cap {
            let step = self.current;
            self.current += 1;
            Some(step)
        } else {
            None
        }
    }
}
