// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod scenario_a_bounded_job;
mod scenario_a_progress_only;
mod scenario_b_broadcast_cancel;
mod scenario_d_worker_redelivery;
mod scenario_e_image_not_ready;
mod support;
