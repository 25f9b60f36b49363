mod common;

use std::time::{Duration, Instant};

use common::{Call, MockGpu, MockWindow};
use inflight_core::{FrameClock, PresentConfig, Resolution};
use inflight_frame::{
    DriverConfig, FrameDriver, FrameError, ImageLayout, ImageTarget, SlotState, SwapchainState,
};

const HD: Resolution = Resolution::new(1280, 720);
const FRAME: Duration = Duration::from_millis(16);

fn driver(slots: usize, start: Instant) -> FrameDriver {
    let config = DriverConfig {
        frames_in_flight: slots,
        present: PresentConfig::new(HD, false),
        slot_timeout: Duration::from_millis(50),
        workgroup_size: [16, 16],
    };
    FrameDriver::with_clock(config, HD, FrameClock::starting_at(start)).unwrap()
}

#[test]
fn steady_state_cycles_slots() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    let window = MockWindow::new(HD);

    for k in 0..10u32 {
        let report = driver
            .run_frame(&mut gpu, &window, start + FRAME * k)
            .unwrap();
        assert!(report.submitted);
        assert!(report.presented);
        assert_eq!(report.recreated, None);
    }

    assert_eq!(gpu.submissions.len(), 10);
    let slots: Vec<usize> = gpu.submissions.iter().map(|s| s.slot).collect();
    assert_eq!(slots, vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
    for s in &gpu.submissions {
        assert_eq!(s.params.resolution(), HD);
        assert_eq!(s.plan.slot(), s.slot);
        assert_eq!(s.plan.image_index(), s.image.index());
        assert!(s.plan.uniform_slots().iter().all(|&u| u == s.slot));
    }

    let stats = driver.stats();
    assert_eq!(stats.frames, 10);
    assert_eq!(stats.submissions, 10);
    assert_eq!(stats.presentations, 10);
    assert_eq!(stats.recreations, 0);
    assert!(gpu.recreated.is_empty());
}

#[test]
fn first_use_of_each_slot_does_not_wait() {
    let start = Instant::now();
    let mut driver = driver(3, start);
    let mut gpu = MockGpu::new(3, HD);
    let window = MockWindow::new(HD);

    for k in 0..3u32 {
        driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap();
    }
    assert_eq!(gpu.count(|c| matches!(c, Call::Wait { .. })), 0);

    driver.run_frame(&mut gpu, &window, start + FRAME * 3).unwrap();
    assert_eq!(gpu.count(|c| matches!(c, Call::Wait { .. })), 1);
    assert!(gpu.calls.contains(&Call::Wait { slot: 0 }));
}

#[test]
fn slot_wait_precedes_resource_reuse() {
    let start = Instant::now();
    let mut driver = driver(3, start);
    let mut gpu = MockGpu::new(3, HD);
    let window = MockWindow::new(HD);

    // The mock panics if a slot's resources are touched while in flight.
    for k in 0..20u32 {
        driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap();
    }
    assert_eq!(gpu.submissions.len(), 20);
    assert_eq!(gpu.count(|c| matches!(c, Call::Wait { .. })), 17);

    // Per frame: wait (after warm-up), acquire, reset, record, write, submit, present.
    let frame_calls: Vec<Call> = gpu.calls[gpu.calls.len() - 7..].to_vec();
    assert_eq!(
        frame_calls,
        vec![
            Call::Wait { slot: 1 },
            Call::Acquire { frame: 19 },
            Call::Reset { slot: 1 },
            Call::Record { slot: 1 },
            Call::WriteParams { slot: 1 },
            Call::Submit { slot: 1 },
            Call::Present { frame: 19 },
        ]
    );
}

#[test]
fn resize_recreates_once_and_next_frame_uses_new_size() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    let mut window = MockWindow::new(HD);
    let resized = Resolution::new(1600, 900);

    for k in 0..5u32 {
        driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap();
    }

    window.size = resized;
    let report = driver.run_frame(&mut gpu, &window, start + FRAME * 5).unwrap();
    assert!(!report.submitted);
    assert_eq!(report.recreated, Some(resized));
    assert_eq!(gpu.submissions.len(), 5);
    assert_eq!(gpu.recreated.len(), 1);
    assert_eq!(gpu.recreated[0].resolution, resized);

    let report = driver.run_frame(&mut gpu, &window, start + FRAME * 6).unwrap();
    assert!(report.submitted);
    assert_eq!(report.params.map(|p| p.resolution()), Some(resized));
    assert_eq!(gpu.submissions[5].image.resolution(), resized);
    assert_eq!(gpu.submissions[5].frame, 6);
    assert_eq!(gpu.recreated.len(), 1);
}

#[test]
fn each_recreation_idles_the_device_once() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    gpu.present_out_of_date.push(2);
    let mut window = MockWindow::new(HD);

    for k in 0..4u32 {
        driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap();
    }
    window.size = Resolution::new(1600, 900);
    driver.run_frame(&mut gpu, &window, start + FRAME * 4).unwrap();

    assert_eq!(gpu.recreated.len(), 2);
    assert_eq!(gpu.count(|c| *c == Call::WaitIdle), 2);
    for (i, call) in gpu.calls.iter().enumerate() {
        if matches!(call, Call::Recreate { .. }) {
            assert_eq!(gpu.calls[i - 1], Call::WaitIdle);
        }
    }
}

#[test]
fn out_of_date_acquire_recreates_at_current_size() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    gpu.acquire_out_of_date.push(3);
    let window = MockWindow::new(HD);

    let reports: Vec<_> = (0..6u32)
        .map(|k| driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap())
        .collect();

    assert!(!reports[3].submitted);
    assert_eq!(reports[3].recreated, Some(HD));
    assert!(reports[4].submitted);
    assert_eq!(gpu.recreated.len(), 1);
    assert_eq!(gpu.submissions.len(), 5);
    assert_eq!(driver.swapchain().state(), SwapchainState::Valid);
}

#[test]
fn not_ready_acquire_recreates() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    gpu.acquire_not_ready.push(1);
    let window = MockWindow::new(HD);

    driver.run_frame(&mut gpu, &window, start).unwrap();
    let report = driver.run_frame(&mut gpu, &window, start + FRAME).unwrap();
    assert!(!report.submitted);
    assert_eq!(report.recreated, Some(HD));
}

#[test]
fn stale_present_recreates_after_submission() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    gpu.present_out_of_date.push(2);
    let window = MockWindow::new(HD);

    for k in 0..2u32 {
        driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap();
    }
    let report = driver.run_frame(&mut gpu, &window, start + FRAME * 2).unwrap();
    assert!(report.submitted);
    assert!(!report.presented);
    assert_eq!(report.recreated, Some(HD));
    assert_eq!(driver.stats().recreations, 1);
}

#[test]
fn minimized_window_skips_gpu_work() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    let mut window = MockWindow::new(HD);

    for k in 0..3u32 {
        driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap();
    }
    let calls_before = gpu.calls.len();

    window.size = Resolution::new(0, 0);
    for k in 3..8u32 {
        let report = driver
            .run_frame(&mut gpu, &window, start + FRAME * k)
            .unwrap();
        assert!(!report.submitted);
        assert_eq!(report.slot, None);
        assert_eq!(report.recreated, None);
    }
    assert_eq!(gpu.calls.len(), calls_before);
    assert_eq!(driver.ring().frame_number(), 8);

    window.size = HD;
    let report = driver.run_frame(&mut gpu, &window, start + FRAME * 8).unwrap();
    assert!(report.submitted);
    assert_eq!(driver.stats().skipped, 5);
    assert!(gpu.recreated.is_empty());
}

#[test]
fn resize_while_minimized_recreates_after_restore() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    let mut window = MockWindow::new(HD);

    driver.run_frame(&mut gpu, &window, start).unwrap();
    window.size = Resolution::new(800, 0);
    let report = driver.run_frame(&mut gpu, &window, start + FRAME).unwrap();
    assert_eq!(report.recreated, None);

    window.size = Resolution::new(800, 600);
    let report = driver.run_frame(&mut gpu, &window, start + FRAME * 2).unwrap();
    assert_eq!(report.recreated, Some(Resolution::new(800, 600)));
    assert_eq!(gpu.recreated.len(), 1);
}

#[test]
fn recreate_adopts_clamped_extent() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    gpu.clamp = Some(Resolution::new(1000, 700));
    let mut window = MockWindow::new(HD);

    driver.run_frame(&mut gpu, &window, start).unwrap();
    window.size = Resolution::new(1024, 768);
    let report = driver.run_frame(&mut gpu, &window, start + FRAME).unwrap();
    assert_eq!(report.recreated, Some(Resolution::new(1000, 700)));

    let report = driver.run_frame(&mut gpu, &window, start + FRAME * 2).unwrap();
    assert_eq!(
        report.params.map(|p| p.resolution()),
        Some(Resolution::new(1000, 700))
    );
    // The clamped size differs from the window but is not re-requested.
    let report = driver.run_frame(&mut gpu, &window, start + FRAME * 3).unwrap();
    assert!(report.submitted);
    assert_eq!(gpu.recreated.len(), 1);
}

#[test]
fn presentable_image_layouts_every_frame() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    let window = MockWindow::new(HD);

    for k in 0..4u32 {
        driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap();
    }
    for s in &gpu.submissions {
        assert_eq!(
            s.plan.layouts_of(ImageTarget::Presentable),
            vec![
                ImageLayout::Undefined,
                ImageLayout::TransferDst,
                ImageLayout::ColorAttachment,
                ImageLayout::PresentSrc,
            ]
        );
    }
}

#[test]
fn time_never_decreases() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    let window = MockWindow::new(HD);

    let instants = [
        start + Duration::from_millis(100),
        start + Duration::from_millis(250),
        start + Duration::from_millis(200),
        start + Duration::from_millis(400),
    ];
    for now in instants {
        driver.run_frame(&mut gpu, &window, now).unwrap();
    }

    let times: Vec<f32> = gpu.submissions.iter().map(|s| s.params.time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
    approx::assert_relative_eq!(times[0], 0.1, epsilon = 1e-4);
    approx::assert_relative_eq!(times[2], 0.25, epsilon = 1e-4);
}

#[test]
fn hung_gpu_reports_timeout() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    let window = MockWindow::new(HD);

    for k in 0..2u32 {
        driver.run_frame(&mut gpu, &window, start + FRAME * k).unwrap();
    }
    gpu.hung = true;
    match driver.run_frame(&mut gpu, &window, start + FRAME * 2) {
        Err(FrameError::SlotTimeout { slot, frame, timeout }) => {
            assert_eq!(slot, 0);
            assert_eq!(frame, Some(0));
            assert_eq!(timeout, Duration::from_millis(50));
        }
        other => panic!("expected slot timeout, got {other:?}"),
    }
    assert_eq!(gpu.submissions.len(), 2);
}

#[test]
fn run_until_close_then_drain() {
    let mut driver = driver(2, Instant::now());
    let mut gpu = MockGpu::new(2, HD);
    let mut window = MockWindow::new(HD);
    window.close_after = Some(6);

    let stats = driver.run(&mut gpu, &mut window).unwrap();
    assert_eq!(stats.frames, 6);
    assert_eq!(stats.submissions, 6);
    assert!(!gpu.any_pending());
    assert_eq!(gpu.calls.last(), Some(&Call::WaitIdle));
    assert_eq!(driver.sync().state(0), Some(SlotState::Idle));
    assert_eq!(driver.sync().state(1), Some(SlotState::Idle));
}

#[test]
fn run_handles_scripted_resize() {
    let mut driver = driver(2, Instant::now());
    let mut gpu = MockGpu::new(2, HD);
    let mut window = MockWindow::new(HD);
    window.close_after = Some(10);
    window.resizes.push((4, Resolution::new(640, 480)));
    window.resizes.push((6, Resolution::new(0, 0)));
    window.resizes.push((8, Resolution::new(640, 480)));

    let stats = driver.run(&mut gpu, &mut window).unwrap();
    assert_eq!(stats.frames, 10);
    assert_eq!(stats.recreations, 1);
    // Polls 4, 6 and 7 submit nothing: one recreate and two minimized frames.
    assert_eq!(stats.skipped, 3);
    assert_eq!(gpu.recreated[0].resolution, Resolution::new(640, 480));
}

#[test]
fn run_drains_on_error() {
    let mut driver = driver(2, Instant::now());
    let mut gpu = MockGpu::new(2, HD);
    gpu.hung = true;
    let mut window = MockWindow::new(HD);
    window.close_after = Some(100);

    let err = driver.run(&mut gpu, &mut window).unwrap_err();
    assert!(matches!(err, FrameError::SlotTimeout { slot: 0, .. }));
    assert_eq!(gpu.calls.last(), Some(&Call::WaitIdle));
    assert_eq!(driver.stats().submissions, 2);
}

#[test]
fn failed_recording_releases_slot() {
    let start = Instant::now();
    let mut driver = driver(2, start);
    let mut gpu = MockGpu::new(2, HD);
    gpu.record_failures.push(0);
    let window = MockWindow::new(HD);

    let err = driver.run_frame(&mut gpu, &window, start).unwrap_err();
    assert!(matches!(err, FrameError::Backend(_)));
    assert_eq!(driver.sync().state(0), Some(SlotState::Idle));
    assert_eq!(gpu.count(|c| matches!(c, Call::Submit { .. })), 0);

    driver.shutdown(&mut gpu).unwrap();
    assert_eq!(gpu.count(|c| matches!(c, Call::Wait { .. })), 0);
    assert_eq!(gpu.calls.last(), Some(&Call::WaitIdle));
}
