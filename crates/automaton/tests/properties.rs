use automaton::{
    hash, Extent, Grid, InteractionStage, KernelImage, KernelProfile, KernelTaps, Parameters,
    Pipeline, PointerState, StateStore, UpdateStage, WARMUP_FRAMES,
};

fn seeded(extent: Extent, frame: u64) -> Grid {
    Grid::from_fn(extent, |x, y| hash::random_color(x, y, frame)).unwrap()
}

fn update_stage(params: &Parameters) -> UpdateStage {
    let image = KernelImage::generate(
        params.outer_radius,
        params.ratio_of_radii,
        params.kernel_profile,
    );
    UpdateStage::new(KernelTaps::from_image(&image))
}

fn released_after_warmup() -> (PointerState, u64) {
    (PointerState::new(0.0, 0.0, false), WARMUP_FRAMES + 5)
}

#[test]
fn update_output_stays_in_unit_range() {
    let extent = Extent::new(24, 16);
    let read = seeded(extent, 3);
    let params = Parameters {
        dt: 5.0,
        outer_radius: 4.0,
        color_mix: [[2.0, -1.5, 0.7], [-3.0, 1.0, 1.0], [0.0, 4.0, -2.0]],
        ..Parameters::default()
    };
    for profile in [KernelProfile::RingCore, KernelProfile::Unimodal] {
        let params = Parameters {
            kernel_profile: profile,
            ..params
        };
        let mut write = Grid::new(extent).unwrap();
        update_stage(&params).apply(&params, &read, &mut write);
        for cell in write.cells() {
            assert!(cell.iter().all(|v| (0.0..=1.0).contains(v)), "{cell:?}");
        }
    }
}

#[test]
fn zero_dt_leaves_grid_unchanged() {
    let extent = Extent::new(16, 12);
    let read = seeded(extent, 11);
    let params = Parameters {
        dt: 0.0,
        outer_radius: 3.0,
        ..Parameters::default()
    };
    let mut write = Grid::new(extent).unwrap();
    update_stage(&params).apply(&params, &read, &mut write);
    assert_eq!(write, read);
}

#[test]
fn kernel_image_is_radially_symmetric() {
    for (radius, profile) in [
        (13.0, KernelProfile::RingCore),
        (6.3, KernelProfile::RingCore),
        (7.0, KernelProfile::Unimodal),
    ] {
        let image = KernelImage::generate(radius, 0.5, profile);
        let side = image.side();
        let half = side as f32 / 2.0;
        let mut by_distance: std::collections::HashMap<u32, [f32; 2]> =
            std::collections::HashMap::new();
        for j in 0..side {
            for i in 0..side {
                let texel = image.texel(i, j);
                assert_eq!(texel, image.texel(j, i));
                assert_eq!(texel, image.texel(side - 1 - i, j));
                assert_eq!(texel, image.texel(i, side - 1 - j));

                let dx = i as f32 + 0.5 - half;
                let dy = j as f32 + 0.5 - half;
                let key = (dx * dx + dy * dy).to_bits();
                let previous = by_distance.entry(key).or_insert(texel);
                assert_eq!(*previous, texel);
            }
        }
    }
}

#[test]
fn brush_paints_exact_disk() {
    let extent = Extent::new(4, 4);
    let initial = Grid::from_fn(extent, |x, y| [0.1 * x as f32, 0.1 * y as f32, 0.5]).unwrap();
    let mut store = StateStore::from_grid(initial.clone()).unwrap();
    let params = Parameters {
        brush_radius: 1.0,
        brush_color: [1.0, 0.0, 0.0],
        ..Parameters::default()
    };
    let (_, frame) = released_after_warmup();
    let stage = InteractionStage::plan(&params, PointerState::new(1.0, 1.0, true), frame);
    let (read, write) = store.split();
    stage.apply(read, write);
    store.promote_write();

    let painted = store.current_read();
    for y in 0..4u32 {
        for x in 0..4u32 {
            let dx = x as f32 - 1.0;
            let dy = y as f32 - 1.0;
            if dx * dx + dy * dy <= 1.0 {
                assert_eq!(painted.get(x, y), [1.0, 0.0, 0.0], "({x}, {y})");
            } else {
                assert_eq!(painted.get(x, y), initial.get(x, y), "({x}, {y})");
            }
        }
    }
}

#[test]
fn kill_clears_whatever_else_is_held() {
    let extent = Extent::new(10, 7);
    let read = seeded(extent, 2);
    let params = Parameters {
        kill: true,
        random_seed: true,
        brush_radius: 100.0,
        ..Parameters::default()
    };
    for frame in [0, WARMUP_FRAMES, 1_000] {
        let stage = InteractionStage::plan(&params, PointerState::new(3.0, 3.0, true), frame);
        let mut write = seeded(extent, 99);
        stage.apply(&read, &mut write);
        assert!(write.cells().iter().all(|cell| *cell == [0.0; 3]));
    }
}

#[test]
fn reseed_varies_per_frame_and_release_is_deterministic() {
    let base = Parameters {
        outer_radius: 3.0,
        ..Parameters::default()
    };
    let reseed = Parameters {
        random_seed: true,
        ..base
    };
    let (pointer, _) = released_after_warmup();

    let mut a = Pipeline::initialize(16, 16, &base).unwrap();
    let mut b = Pipeline::initialize(16, 16, &base).unwrap();
    for _ in 0..WARMUP_FRAMES {
        a.tick(base, pointer).unwrap();
        b.tick(base, pointer).unwrap();
    }

    let first = a.tick(reseed, pointer).unwrap().clone();
    let second = a.tick(reseed, pointer).unwrap().clone();
    assert_ne!(first, second);
    b.tick(reseed, pointer).unwrap();
    b.tick(reseed, pointer).unwrap();
    assert_eq!(a.current(), b.current());

    let update = UpdateStage::new(a.kernel().unwrap().clone());
    for _ in 0..3 {
        let previous = a.current().unwrap().clone();
        let mut expected = Grid::new(previous.extent()).unwrap();
        update.apply(&base, &previous, &mut expected);
        let next = a.tick(base, pointer).unwrap().clone();
        assert_eq!(next, expected);
        assert_eq!(&next, b.tick(base, pointer).unwrap());
    }
}

#[test]
fn resize_yields_fresh_grid_and_zero_counter() {
    let params = Parameters {
        outer_radius: 2.0,
        ..Parameters::default()
    };
    let mut pipeline = Pipeline::initialize(12, 12, &params).unwrap();
    for _ in 0..4 {
        pipeline
            .tick(params, PointerState::centered(pipeline.extent()))
            .unwrap();
    }
    assert_eq!(pipeline.frame(), 4);
    assert!(pipeline
        .current()
        .unwrap()
        .cells()
        .iter()
        .any(|cell| *cell != [0.0; 3]));

    pipeline.resize(20, 9).unwrap();
    assert_eq!(pipeline.frame(), 0);
    let current = pipeline.current().unwrap();
    assert_eq!(current.extent(), Extent::new(20, 9));
    assert!(current.cells().iter().all(|cell| *cell == [0.0; 3]));
}

#[test]
fn zero_thresholds_freeze_seeded_grid() {
    let extent = Extent::new(8, 8);
    let read = seeded(extent, 5);
    let params = Parameters {
        dt: 0.3,
        outer_radius: 2.0,
        birth1: 0.0,
        birth2: 0.0,
        survival1: 0.0,
        survival2: 0.0,
        ..Parameters::default()
    };
    let mut write = Grid::new(extent).unwrap();
    update_stage(&params).apply(&params, &read, &mut write);
    assert_eq!(write, read);
}
