pub mod deployment_show;
pub mod queue_inspect;
pub mod run;
