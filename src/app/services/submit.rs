// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Assembly of the spark-submit step that carries a job onto a cluster.

use std::collections::BTreeMap;

use crate::app::types::{ActionOnFailure, StepSpec};

const SPARK_SUBMIT: &str = "spark-submit";
const DEPLOY_MODE: &str = "cluster";

/// Build the step wrapping a spark-submit invocation: fixed deploy-mode and
/// entry-point flags, one `--conf key=value` pair per entry in map iteration
/// order, then the artifact location, then the positional arguments.
pub fn build_submit_step(
    main_class: &str,
    artifact_location: &str,
    confs: &BTreeMap<String, String>,
    args: &[String],
) -> StepSpec {
    let mut command = vec![
        SPARK_SUBMIT.to_string(),
        "--deploy-mode".to_string(),
        DEPLOY_MODE.to_string(),
        "--class".to_string(),
        main_class.to_string(),
    ];
    for (key, value) in confs {
        command.push("--conf".to_string());
        command.push(format!("{key}={value}"));
    }
    command.push(artifact_location.to_string());
    command.extend(args.iter().cloned());

    StepSpec {
        name: main_class.to_string(),
        action_on_failure: ActionOnFailure::Continue,
        command,
    }
}
