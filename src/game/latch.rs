//! 카운트다운 랑데부 (참여 대기용)

use tokio::sync::watch;

/// `count`번의 `count_down`이 끝나면 `wait`가 풀리는 래치
///
/// 완료 순서는 상관없고, 0 아래로는 내려가지 않습니다.
#[derive(Debug)]
pub struct CountdownLatch {
    remaining: watch::Sender<usize>,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        let (remaining, _) = watch::channel(count);
        Self { remaining }
    }

    /// 남은 카운트를 하나 줄이고 새 값을 반환
    pub fn count_down(&self) -> usize {
        let mut left = 0;
        self.remaining.send_modify(|n| {
            *n = n.saturating_sub(1);
            left = *n;
        });
        left
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// 카운트가 0이 될 때까지 대기
    pub async fn wait(&self) {
        let mut rx = self.remaining.subscribe();
        // sender가 self에 있으므로 채널이 닫히지 않음
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
