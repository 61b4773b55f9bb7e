use std::collections::HashMap;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::TaskStream;
use crate::models::Task;

/// 按任务 id 管理 `watch` 通道，供各个仓库实现共用
///
/// 第一次观察时建立通道，用仓库当前存储的值作为初值。
/// 最后一个观察者离开后通道作废，下次观察重新加载。
#[derive(Default)]
pub struct TaskWatchers {
    channels: Mutex<HashMap<String, watch::Sender<Option<Task>>>>,
}

impl TaskWatchers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅 `id`；没有活跃的观察者时用 `load` 读取初值
    pub fn observe(&self, id: &str, load: impl FnOnce() -> Option<Task>) -> TaskStream {
        let rx = {
            let mut channels = self.channels.lock();
            match channels.get(id) {
                Some(tx) if tx.receiver_count() > 0 => tx.subscribe(),
                _ => {
                    let (tx, rx) = watch::channel(load());
                    channels.insert(id.to_string(), tx);
                    rx
                }
            }
        };

        into_stream(rx)
    }

    /// 推送新值；顺便清掉已经没人订阅的通道
    pub fn publish(&self, id: &str, value: Option<Task>) {
        let mut channels = self.channels.lock();
        let Some(tx) = channels.get(id) else {
            return;
        };
        if tx.receiver_count() == 0 {
            channels.remove(id);
        } else {
            tx.send_replace(value);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.channels.lock().len()
    }
}

fn into_stream(rx: watch::Receiver<Option<Task>>) -> TaskStream {
    futures::stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let value = rx.borrow_and_update().clone();
        Some((value, (rx, false)))
    })
    .boxed()
}
