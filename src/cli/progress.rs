use std::collections::HashSet;
use std::fmt::Display;
use std::time::Duration;

use anyhow::Error;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::plan::TaskKey;
use crate::Result;

#[derive(PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Pending,
    InProgress,
    Disabled,
    Skipped,
    Failed,
}

pub struct StepContext {
    step_num: usize,
    steps: Vec<Step>,
}

pub struct Step {
    desc: String,
    key: TaskKey,
    progress_bar: ProgressBar,
    disabled: bool,
}

impl Step {
    fn new(desc: &str, key: TaskKey, disabled: bool) -> Self {
        Self {
            desc: desc.to_string(),
            key,
            progress_bar: ProgressBar::new_spinner(),
            disabled,
        }
    }
}

impl StepContext {
    pub fn new(tasks: &HashSet<TaskKey>) -> Self {
        println!("Tasks:");

        let mut steps = vec![
            Step::new("Generate plan", TaskKey::GeneratePlan, false),
            Step::new("Generate dies", TaskKey::GenerateDies, false),
            Step::new("Place dies", TaskKey::PlaceDies, false),
            Step::new("Write GDS", TaskKey::WriteGds, false),
            Step::new(
                "Render layout",
                TaskKey::RenderLayout,
                !tasks.contains(&TaskKey::RenderLayout),
            ),
            Step::new(
                "Render die map",
                TaskKey::RenderMap,
                !tasks.contains(&TaskKey::RenderMap),
            ),
        ];
        let mp = MultiProgress::new();
        let num_steps = steps.iter().filter(|step| !step.disabled).count();
        let mut counter = 0;
        let width = format!("{}", num_steps).len();
        for (i, step) in steps.iter_mut().enumerate() {
            mp.insert(i + 1, step.progress_bar.clone());
            if step.disabled {
                let msg = Some(format!("[-/-] {}", step.desc));
                step.set_status(StepStatus::Disabled, msg);
            } else {
                counter += 1;
                let msg = Some(format!(
                    "[{:width$}/{:width$}] {}",
                    counter, num_steps, step.desc
                ));
                step.set_status(StepStatus::Pending, msg);
            }
        }
        if !steps.is_empty() {
            steps[0]
                .progress_bar
                .enable_steady_tick(Duration::from_millis(200));
        }
        StepContext { step_num: 0, steps }
    }

    pub fn advance(&mut self) {
        self.step_num += 1;
        while let Some(current_step) = self.current_step() {
            if !current_step.disabled {
                break;
            }
            self.step_num += 1;
        }
    }

    #[inline]
    pub fn current_step(&mut self) -> Option<&mut Step> {
        self.steps.get_mut(self.step_num)
    }

    pub fn check<T>(&mut self, res: Result<T>) -> Result<T> {
        if res.is_err() {
            if let Some(current_step) = self.current_step() {
                current_step.set_status(StepStatus::Failed, None);
                self.advance();
                while let Some(current_step) = self.current_step() {
                    current_step.set_status(StepStatus::Skipped, None);
                    self.advance();
                }
            }
            println!("\n");
        }

        res
    }

    pub fn bail(&mut self, e: Error) -> Result<()> {
        self.check(Err(e))
    }

    /// Marks `key` done and starts the next enabled step.
    ///
    /// Steps must be finished in order.
    pub fn finish(&mut self, key: TaskKey) {
        if let Some(current_step) = self.current_step() {
            if current_step.key != key {
                panic!("A step was completed out of order");
            }

            current_step.set_status(StepStatus::Done, None);

            self.advance();

            if let Some(current_step) = self.current_step() {
                current_step.set_status(StepStatus::InProgress, None);
            } else {
                self.done();
            }
        } else {
            panic!("A step was completed after all steps were marked completed");
        }
    }

    pub fn done(&mut self) {
        println!("\n\nCompleted all tasks");
    }
}

fn format_template(spinner: bool, status: impl Display) -> String {
    if spinner {
        format!("{{spinner:.green}} {:16} {{msg}}", status)
    } else {
        format!("  {:16} {{msg}}", status)
    }
}

impl Step {
    fn set_status(&mut self, status: StepStatus, msg: Option<String>) {
        let status_template = match status {
            StepStatus::Disabled => {
                format_template(false, "Disabled".truecolor(120, 120, 120).bold())
            }
            StepStatus::Done => format_template(false, "Done".green().bold()),
            StepStatus::Failed => format_template(false, "Failed".bright_white().on_red().bold()),
            StepStatus::InProgress => format_template(true, "In Progress".bright_white().bold()),
            StepStatus::Pending => format_template(true, "Pending".blue().bold()),
            StepStatus::Skipped => format_template(false, "Skipped".yellow().bold()),
        };
        let style = ProgressStyle::with_template(&status_template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        self.progress_bar.set_style(style);

        if let Some(msg) = msg {
            self.progress_bar.set_message(msg);
        }

        if status == StepStatus::InProgress {
            self.progress_bar
                .enable_steady_tick(Duration::from_millis(200));
        } else if status != StepStatus::Pending {
            self.progress_bar.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_steps_are_skipped() {
        let tasks = HashSet::from([TaskKey::RenderMap]);
        let mut ctx = StepContext::new(&tasks);
        for key in [
            TaskKey::GeneratePlan,
            TaskKey::GenerateDies,
            TaskKey::PlaceDies,
            TaskKey::WriteGds,
        ] {
            ctx.finish(key);
        }
        assert!(matches!(
            ctx.current_step(),
            Some(Step {
                key: TaskKey::RenderMap,
                ..
            })
        ));
        ctx.finish(TaskKey::RenderMap);
        assert!(ctx.current_step().is_none());
    }

    #[test]
    fn failure_skips_remaining_steps() {
        let mut ctx = StepContext::new(&HashSet::new());
        ctx.finish(TaskKey::GeneratePlan);
        assert!(ctx.bail(anyhow::anyhow!("no dies")).is_err());
        assert!(ctx.current_step().is_none());
    }
}
