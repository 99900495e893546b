//! Двумерное k-d дерево для поиска ближайшего транспортного средства.
//!
//! Узел на глубине `d` делит пространство по оси `d % 2` (0 — широта,
//! 1 — долгота). В левом поддереве лежат только точки, строго меньшие узла
//! по этой оси, равные уходят вправо. Поиск — обход в глубину с отсечением
//! дальнего поддерева по расстоянию до разделяющей прямой.
//!
//! Метрика индекса — евклидово расстояние в градусах, без учёта кривизны.

use serde::Serialize;
use tracing::info;

use super::{euclidean_distance, Point, DIMENSIONS};
use crate::PositionRecord;

/// Узел дерева. Владеет записью и потомками.
#[derive(Debug)]
struct KdNode {
    point: Point,
    record: PositionRecord,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

/// k-d дерево по записям о положении.
///
/// После построения только читается, поэтому его можно разделять между
/// потоками без блокировок.
#[derive(Debug, Default)]
pub struct KdTree {
    root: Option<Box<KdNode>>,
    size: usize,
    depth: usize,
}

/// Результат поиска ближайшего соседа.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest<'a> {
    /// Найденная запись.
    pub record: &'a PositionRecord,
    /// Точка записи в пространстве индекса.
    pub point: Point,
    /// Евклидово расстояние в градусах от точки запроса.
    pub distance: f64,
    /// Сколько узлов было просмотрено.
    pub visited: usize,
}

/// Статистика дерева.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TreeStats {
    pub depth: usize,
    pub node_count: usize,
    pub leaf_count: usize,
}

/// Шаг обхода при поиске.
enum Step<'a> {
    /// Посетить узел на заданной глубине.
    Visit(&'a KdNode, usize),
    /// Дальнее поддерево: посещается, только если разделяющая прямая ближе
    /// текущего лучшего расстояния на момент проверки.
    Far {
        node: &'a KdNode,
        depth: usize,
        gap: f64,
    },
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl KdNode {
    fn new(record: PositionRecord) -> Self {
        Self {
            point: record.point(),
            record,
            left: None,
            right: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

impl KdTree {
    /// Создаёт пустое дерево.
    pub fn new() -> Self {
        Self::default()
    }

    /// Строит дерево последовательной вставкой в порядке записей.
    ///
    /// Балансировки нет: на упорядоченных данных глубина растёт линейно.
    pub fn build(records: impl IntoIterator<Item = PositionRecord>) -> Self {
        let mut tree = Self::new();
        for record in records {
            tree.insert(record);
        }
        info!(
            records = tree.size,
            depth = tree.depth,
            "Built k-d index by sequential insertion"
        );
        tree
    }

    /// Bulk loading: строит сбалансированное дерево разбиением по медиане.
    ///
    /// Глубина не превышает `⌈log2(n + 1)⌉`, если на оси разбиения нет
    /// длинных серий одинаковых значений. При равных расстояниях победитель
    /// может отличаться от дерева, построенного через [`KdTree::build`].
    pub fn bulk_load(records: Vec<PositionRecord>) -> Self {
        let size = records.len();
        let nodes = records.into_iter().map(KdNode::new).collect();
        let root = Self::build_balanced(nodes, 0);
        let mut tree = Self {
            root,
            size,
            depth: 0,
        };
        tree.depth = tree.stats().depth;
        info!(
            records = tree.size,
            depth = tree.depth,
            "Built k-d index by median split"
        );
        tree
    }

    /// Рекурсивное построение поддерева из несвязанных узлов.
    fn build_balanced(
        mut nodes: Vec<KdNode>,
        depth: usize,
    ) -> Option<Box<KdNode>> {
        if nodes.is_empty() {
            return None;
        }

        let axis = depth % DIMENSIONS;
        nodes.sort_by(|a, b| a.point[axis].total_cmp(&b.point[axis]));

        // Медиана — первый элемент своей серии равных значений, чтобы все
        // равные ей точки оказались справа.
        let mut mid = nodes.len() / 2;
        while mid > 0 && nodes[mid - 1].point[axis] == nodes[mid].point[axis] {
            mid -= 1;
        }

        let right = nodes.split_off(mid + 1);
        let mut median = nodes.pop()?;
        median.left = Self::build_balanced(nodes, depth + 1);
        median.right = Self::build_balanced(right, depth + 1);
        Some(Box::new(median))
    }

    /// Вставляет запись.
    pub fn insert(
        &mut self,
        record: PositionRecord,
    ) {
        let node = KdNode::new(record);
        let mut slot = &mut self.root;
        let mut depth = 0;

        while let Some(current) = slot {
            let axis = depth % DIMENSIONS;
            slot = if node.point[axis] < current.point[axis] {
                &mut current.left
            } else {
                &mut current.right
            };
            depth += 1;
        }

        *slot = Some(Box::new(node));
        self.size += 1;
        self.depth = self.depth.max(depth + 1);
    }

    /// Ищет ближайшую к `target` запись.
    ///
    /// Возвращает `None` только для пустого дерева. При равных расстояниях
    /// остаётся первый найденный узел. Узел с несравнимым (NaN) расстоянием
    /// возвращается, только если сравнимых нет вовсе.
    pub fn nearest(
        &self,
        target: Point,
    ) -> Option<Nearest<'_>> {
        let root = self.root.as_deref()?;

        let mut best: Option<(&KdNode, f64)> = None;
        let mut visited = 0;
        let mut stack = vec![Step::Visit(root, 0)];

        while let Some(step) = stack.pop() {
            let (node, depth) = match step {
                Step::Visit(node, depth) => (node, depth),
                Step::Far { node, depth, gap } => {
                    // NaN-зазор ничего не говорит о дальнем поддереве.
                    if gap.is_nan() || gap < pruning_bound(best.map(|(_, d)| d)) {
                        (node, depth)
                    } else {
                        continue;
                    }
                }
            };

            visited += 1;
            let distance = euclidean_distance(target, node.point);
            if is_closer(best.map(|(_, d)| d), distance) {
                best = Some((node, distance));
            }

            let axis = depth % DIMENSIONS;
            let (near, far) = if target[axis] < node.point[axis] {
                (&node.left, &node.right)
            } else {
                (&node.right, &node.left)
            };

            // Стек LIFO: ближнее поддерево обходится целиком до проверки
            // дальнего.
            if let Some(far) = far.as_deref() {
                stack.push(Step::Far {
                    node: far,
                    depth: depth + 1,
                    gap: (target[axis] - node.point[axis]).abs(),
                });
            }
            if let Some(near) = near.as_deref() {
                stack.push(Step::Visit(near, depth + 1));
            }
        }

        best.map(|(node, distance)| Nearest {
            record: &node.record,
            point: node.point,
            distance,
            visited,
        })
    }

    /// Возвращает количество записей в дереве.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Проверяет, пусто ли дерево.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Глубина дерева (0 для пустого, 1 для одного узла).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Статистика дерева (глубина, количество узлов и листьев).
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut stack: Vec<(&KdNode, usize)> =
            self.root.as_deref().map(|root| (root, 1)).into_iter().collect();

        while let Some((node, level)) = stack.pop() {
            stats.node_count += 1;
            stats.depth = stats.depth.max(level);
            if node.is_leaf() {
                stats.leaf_count += 1;
            }
            for child in [&node.left, &node.right].into_iter().filter_map(|c| c.as_deref()) {
                stack.push((child, level + 1));
            }
        }

        stats
    }

    /// Итератор по записям в прямом порядке обхода (узел, левое, правое).
    pub fn iter(&self) -> impl Iterator<Item = &PositionRecord> + '_ {
        let mut stack: Vec<&KdNode> = self.root.as_deref().into_iter().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            if let Some(right) = node.right.as_deref() {
                stack.push(right);
            }
            if let Some(left) = node.left.as_deref() {
                stack.push(left);
            }
            Some(&node.record)
        })
    }
}

/// Линейный поиск ближайшей записи в той же метрике, что и у дерева.
///
/// Записи просматриваются по порядку, при равных расстояниях остаётся
/// первая.
pub fn brute_force_nearest(
    records: &[PositionRecord],
    target: Point,
) -> Option<Nearest<'_>> {
    let mut best: Option<(&PositionRecord, Point, f64)> = None;

    for record in records {
        let point = record.point();
        let distance = euclidean_distance(target, point);
        if is_closer(best.map(|(_, _, d)| d), distance) {
            best = Some((record, point, distance));
        }
    }

    best.map(|(record, point, distance)| Nearest {
        record,
        point,
        distance,
        visited: records.len(),
    })
}

/// Заменяет ли кандидат на расстоянии `distance` текущего лучшего.
///
/// Несравнимое (NaN) расстояние принимается только при пустом лучшем и
/// уступает любому сравнимому. При равенстве остаётся прежний.
pub fn is_closer(
    best: Option<f64>,
    distance: f64,
) -> bool {
    match best {
        None => true,
        Some(current) if current.is_nan() => !distance.is_nan(),
        Some(current) => distance < current,
    }
}

/// Граница отсечения: бесконечна, пока нет сравнимого лучшего.
fn pruning_bound(best: Option<f64>) -> f64 {
    match best {
        Some(distance) if !distance.is_nan() => distance,
        _ => f64::INFINITY,
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие трейты
////////////////////////////////////////////////////////////////////////////////

// Вырожденное дерево может быть глубиной в миллионы узлов, поэтому узлы
// освобождаются без рекурсии.
impl Drop for KdTree {
    fn drop(&mut self) {
        let mut stack: Vec<Box<KdNode>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

impl FromIterator<PositionRecord> for KdTree {
    fn from_iter<T: IntoIterator<Item = PositionRecord>>(iter: T) -> Self {
        Self::build(iter)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
