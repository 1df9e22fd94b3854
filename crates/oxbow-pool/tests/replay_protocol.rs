//! End-to-end exercises of the replay protocol: load, append with
//! eviction, sample, and step, the way a training loop drives the pool.

use oxbow_core::{ChannelSpec, ChannelTemplate, Dtype, Environment, Tensor};
use oxbow_pool::{PoolConfig, SessionPool, TrajectoryBatch};

/// Three 5-tick trajectories with a single 4-wide observation channel.
/// Reward rows are constant per trajectory: 1, 0, 2.
fn three_sessions() -> TrajectoryBatch {
    let obs: Vec<f32> = (0..3 * 5 * 4).map(|x| x as f32).collect();
    let actions: Vec<i32> = (0..15).collect();
    let rewards = vec![
        1.0, 1.0, 1.0, 1.0, 1.0, //
        0.0, 0.0, 0.0, 0.0, 0.0, //
        2.0, 2.0, 2.0, 2.0, 2.0,
    ];
    TrajectoryBatch::new(
        vec![Tensor::from_f32(&[3, 5, 4], obs)],
        vec![Tensor::from_i32(&[3, 5], actions)],
        Tensor::from_f32(&[3, 5], rewards),
    )
}

fn replay_pool() -> SessionPool {
    SessionPool::new(PoolConfig {
        observations: ChannelSpec::Templates(vec![ChannelTemplate::new(&[4])]),
        ..PoolConfig::default()
    })
}

#[test]
fn sampled_rows_are_recorded_rows_verbatim() {
    let mut pool = replay_pool();
    pool.load(three_sessions()).unwrap();

    let batch = pool.sample(2, false).unwrap();
    assert_eq!(batch.len(), 2);

    let originals: Vec<Tensor> = (0..3).map(|r| pool.rewards().tensor().row(r)).collect();
    for r in 0..2 {
        let row = batch.rewards().row(r);
        assert!(
            originals.contains(&row),
            "sampled reward row {r} is not one of the loaded rows"
        );
    }
}

#[test]
fn oversampling_without_replacement_caps_at_pool_size() {
    let mut pool = replay_pool();
    pool.load(three_sessions()).unwrap();
    let batch = pool.sample(50, false).unwrap();
    assert_eq!(batch.len(), 3);
}

#[test]
fn append_evicts_oldest_and_keeps_arrays_parallel() {
    let mut pool = replay_pool();
    pool.load(three_sessions()).unwrap();

    // Two fresh trajectories with reward 7.
    let fresh = TrajectoryBatch::new(
        vec![Tensor::from_f32(&[2, 5, 4], vec![9.0; 40])],
        vec![Tensor::from_i32(&[2, 5], vec![0; 10])],
        Tensor::from_f32(&[2, 5], vec![7.0; 10]),
    );
    pool.append(fresh, Some(3)).unwrap();

    assert_eq!(pool.pool_size(), 3);
    // Most recent three of [1, 0, 2] ++ [7, 7]: rows 2, 7, 7.
    let rewards = pool.rewards().tensor().as_f32().unwrap();
    assert_eq!(rewards[0], 2.0);
    assert_eq!(rewards[5], 7.0);
    assert_eq!(rewards[10], 7.0);
    // Every stream shares the truncated extents.
    assert_eq!(pool.observations()[0].tensor().shape(), &[3, 5, 4]);
    assert_eq!(pool.actions()[0].tensor().shape(), &[3, 5]);
    assert_eq!(pool.liveness().tensor().shape(), &[3, 5]);
    assert_eq!(pool.preceding_memories()[0].tensor().shape()[0], 3);
}

#[test]
fn stepping_a_sampled_batch_never_faults_at_the_last_tick() {
    let mut pool = replay_pool();
    pool.load(three_sessions()).unwrap();
    let batch = pool.sample(2, false).unwrap();

    // Walk every tick, including acting at T-1.
    let mut ticks = vec![0usize; batch.len()];
    for _ in 0..batch.sequence_length() {
        let (next, obs) = batch.action_result(&ticks, &[]).unwrap();
        assert_eq!(obs[0].shape(), &[2, 4]);
        ticks = next;
    }
    assert_eq!(ticks, vec![5, 5]);
    // The last step read the zero padding tick.
    let (_, obs) = batch
        .action_result(&vec![4; batch.len()], &[])
        .unwrap();
    assert_eq!(obs[0].as_f32().unwrap(), &[0.0; 8][..]);
}

#[test]
fn liveness_casts_to_byte_flags() {
    let mut pool = replay_pool();
    // Liveness supplied as floats; the stream stores bytes.
    let batch = three_sessions().with_liveness(Tensor::from_f32(
        &[3, 5],
        vec![
            1.0, 1.0, 1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, 0.0, 0.0, //
            1.0, 1.0, 1.0, 1.0, 1.0,
        ],
    ));
    pool.load(batch).unwrap();
    assert_eq!(pool.liveness().tensor().dtype(), Dtype::U8);
    assert_eq!(
        pool.liveness().tensor().as_u8().unwrap()[..5],
        [1, 1, 1, 0, 0]
    );
}
